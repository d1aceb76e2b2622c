//! Product model, catalog filters and admin payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ShopError};

/// Free-form key/value specification sheet
pub type Specifications = serde_json::Map<String, serde_json::Value>;

/// Product entity. Prices are integer minor currency units (1999 is 19.99).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub category: String,
    pub description: String,
    pub image: String,
    pub rating: f64,
    pub reviews: i32,
    pub stock: i32,
    pub specifications: Specifications,
}

/// New product creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub specifications: Specifications,
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ShopError::Validation("product name is required".into()));
        }
        if self.category.trim().is_empty() {
            return Err(ShopError::Validation("product category is required".into()));
        }
        check_numbers(Some(self.price), Some(self.stock), Some(self.rating), Some(self.reviews))
    }

    pub(crate) fn into_product(self, id: Uuid) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            category: self.category,
            description: self.description,
            image: self.image,
            rating: self.rating,
            reviews: self.reviews,
            stock: self.stock,
            specifications: self.specifications,
        }
    }
}

/// Product update payload. Unset fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub stock: Option<i32>,
    pub specifications: Option<Specifications>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.rating.is_none()
            && self.reviews.is_none()
            && self.stock.is_none()
            && self.specifications.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ShopError::Validation("product name cannot be empty".into()));
        }
        if self.category.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ShopError::Validation("product category cannot be empty".into()));
        }
        check_numbers(self.price, self.stock, self.rating, self.reviews)
    }

    pub(crate) fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(image) = &self.image {
            product.image = image.clone();
        }
        if let Some(rating) = self.rating {
            product.rating = rating;
        }
        if let Some(reviews) = self.reviews {
            product.reviews = reviews;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(specifications) = &self.specifications {
            product.specifications = specifications.clone();
        }
    }
}

fn check_numbers(
    price: Option<i64>,
    stock: Option<i32>,
    rating: Option<f64>,
    reviews: Option<i32>,
) -> Result<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(ShopError::Validation("price cannot be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(ShopError::Validation("stock cannot be negative".into()));
    }
    if rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
        return Err(ShopError::Validation("rating must be between 0 and 5".into()));
    }
    if reviews.is_some_and(|r| r < 0) {
        return Err(ShopError::Validation("reviews cannot be negative".into()));
    }
    Ok(())
}

/// Catalog ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Rating,
    #[default]
    Name,
}

impl ProductSort {
    /// Parse a sort key; unknown keys fall back to ordering by name.
    pub fn parse(key: &str) -> Self {
        match key {
            "price_asc" => ProductSort::PriceAsc,
            "price_desc" => ProductSort::PriceDesc,
            "rating" => ProductSort::Rating,
            _ => ProductSort::Name,
        }
    }

    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            ProductSort::PriceAsc => "price ASC, name ASC",
            ProductSort::PriceDesc => "price DESC, name ASC",
            ProductSort::Rating => "rating DESC, name ASC",
            ProductSort::Name => "name ASC",
        }
    }

    pub(crate) fn sort(&self, products: &mut [Product]) {
        match self {
            ProductSort::PriceAsc => {
                products.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)))
            }
            ProductSort::PriceDesc => {
                products.sort_by(|a, b| b.price.cmp(&a.price).then_with(|| a.name.cmp(&b.name)))
            }
            ProductSort::Rating => products.sort_by(|a, b| {
                b.rating
                    .total_cmp(&a.rating)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            ProductSort::Name => products.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }
}

/// Catalog listing filter
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Category to filter on. Empty and `all` mean no category filter.
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all")
    }

    /// Trimmed search term, if any
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Case-insensitive substring match on name or description
    pub(crate) fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category() {
            if product.category != category {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            return product.name.to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term);
        }
        true
    }
}
