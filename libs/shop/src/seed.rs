//! Demo data for a fresh store

use serde_json::Value;
use tracing::info;

use crate::accounts::AccountService;
use crate::catalog::CatalogService;
use crate::models::{NewProduct, Registration, Role, Specifications};
use crate::store::Store;
use crate::Result;

fn specs(pairs: &[(&str, &str)]) -> Specifications {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

fn account(email: &str, password: &str, name: &str, phone: &str, address: &str) -> Registration {
    Registration {
        email: email.into(),
        password: password.into(),
        name: name.into(),
        phone: Some(phone.into()),
        address: Some(address.into()),
    }
}

fn demo_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Apple MacBook Air M2".into(),
            price: 129_999,
            category: "Electronics".into(),
            description: "13.6-inch Liquid Retina display, Apple M2 chip, 8 GB unified memory, 256 GB SSD.".into(),
            image: "https://images.unsplash.com/photo-1517336714731-489689fd1ca8?w=400&h=300&fit=crop".into(),
            rating: 4.8,
            reviews: 156,
            stock: 15,
            specifications: specs(&[
                ("Processor", "Apple M2"),
                ("Memory", "8 GB"),
                ("SSD", "256 GB"),
                ("Display", "13.6'' Liquid Retina"),
                ("Weight", "1.24 kg"),
            ]),
        },
        NewProduct {
            name: "Samsung Galaxy S23".into(),
            price: 89_999,
            category: "Electronics".into(),
            description: "6.1-inch Dynamic AMOLED 2X, Snapdragon 8 Gen 2, 8 GB RAM, 256 GB storage.".into(),
            image: "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?w=400&h=300&fit=crop".into(),
            rating: 4.6,
            reviews: 89,
            stock: 32,
            specifications: specs(&[
                ("Display", "6.1'' Dynamic AMOLED"),
                ("Processor", "Snapdragon 8 Gen 2"),
                ("RAM", "8 GB"),
                ("Storage", "256 GB"),
                ("Battery", "3900 mAh"),
            ]),
        },
        NewProduct {
            name: "Sony WH-1000XM5 Headphones".into(),
            price: 34_999,
            category: "Electronics".into(),
            description: "Wireless headphones with active noise cancelling and up to 30 hours of battery life.".into(),
            image: "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=400&h=300&fit=crop".into(),
            rating: 4.9,
            reviews: 214,
            stock: 47,
            specifications: specs(&[
                ("Type", "Over-ear"),
                ("Noise cancelling", "Active"),
                ("Battery life", "30 hours"),
                ("Weight", "250 g"),
                ("Bluetooth", "5.2"),
            ]),
        },
        NewProduct {
            name: "Nike Air Max 270".into(),
            price: 12_999,
            category: "Clothing & Shoes".into(),
            description: "Men's sneakers with a Max Air 270 unit for all-day comfort.".into(),
            image: "https://images.unsplash.com/photo-1542291026-7eec264c27ff?w=400&h=300&fit=crop".into(),
            rating: 4.4,
            reviews: 312,
            stock: 0,
            specifications: specs(&[
                ("Upper", "Mesh and synthetic leather"),
                ("Sole", "Rubber"),
                ("Colour", "Black/White"),
                ("Sizes", "38-47"),
            ]),
        },
        NewProduct {
            name: "Clean Code by Robert C. Martin".into(),
            price: 2_499,
            category: "Books".into(),
            description: "A handbook of agile software craftsmanship.".into(),
            image: "https://images.unsplash.com/photo-1544716278-ca5e3f4abd8c?w=400&h=300&fit=crop".into(),
            rating: 4.7,
            reviews: 89,
            stock: 23,
            specifications: specs(&[
                ("Author", "Robert C. Martin"),
                ("Pages", "464"),
                ("Language", "English"),
                ("Year", "2008"),
            ]),
        },
    ]
}

/// Seed demo users and products into empty tables. Tables that already hold
/// data are left alone.
pub async fn seed_demo_data(
    store: &dyn Store,
    accounts: &AccountService,
    catalog: &CatalogService,
) -> Result<()> {
    let stats = store.stats().await?;

    if stats.total_users == 0 {
        info!("seeding demo users");
        accounts
            .register(account(
                "user@example.com",
                "password123",
                "Ivan Petrov",
                "+7 (999) 123-45-67",
                "Moscow, Primernaya st. 1",
            ))
            .await?;
        accounts
            .register(account(
                "test@test.com",
                "test123",
                "Test Testov",
                "+7 (999) 987-65-43",
                "Saint Petersburg, Nevsky pr. 10",
            ))
            .await?;
        accounts
            .create(
                account(
                    "admin@admin.kz",
                    "admin123",
                    "Administrator",
                    "+7 (777) 777-77-77",
                    "Admin address",
                ),
                Role::Admin,
            )
            .await?;
    }

    if stats.total_products == 0 {
        info!("seeding demo products");
        for product in demo_products() {
            catalog.create_product(product).await?;
        }
    }

    Ok(())
}
