//! # Seed Data Generator
//!
//! Populates the database with a demo catalog, coupons and a cart.
//!
//! ## Usage
//! ```bash
//! # Seed ./storefront_dev.db with the default demo user
//! cargo run -p storefront-db --bin seed
//!
//! # Specify database path and cart owner
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db --user alice
//! ```
//!
//! ## Generated Data
//! - Products in Electronics, Clothing, Home and Books
//! - Coupons: SAVE20, FLAT50, ELECTRONICS15, CLOTHING25, BUY2GET1, MEGA50, FREESHIP
//! - A cart for the demo user (phone, earbuds, t-shirts)

use chrono::{Duration, Utc};
use clap::Parser;
use uuid::Uuid;

use storefront_core::{Coupon, CouponRuleRecord, DiscountKind, Money, Percentage, Product, RuleType};
use storefront_db::{Database, DbConfig};

/// Demo catalog: (sku, name, category, price in cents, stock)
const CATALOG: &[(&str, &str, &str, i64, i64)] = &[
    ("IPH15PRO-256-BLK", "iPhone 15 Pro", "Electronics", 99999, 50),
    ("MBP16-M3MAX-1TB", "MacBook Pro 16\"", "Electronics", 249999, 30),
    ("APP2-WHT", "AirPods Pro 2", "Electronics", 24999, 100),
    ("IPAD-AIR-M1-256", "iPad Air", "Electronics", 59999, 75),
    ("TSH-COT-BLU-L", "Classic Cotton T-Shirt", "Clothing", 2999, 200),
    ("JNS-DEN-BLU-32", "Slim Fit Jeans", "Clothing", 7999, 150),
    ("JKT-WIN-BLK-L", "Winter Jacket", "Clothing", 14999, 80),
    ("COF-MAK-DLX", "Coffee Maker Deluxe", "Home", 8999, 60),
    ("BLN-PRO-3000", "Blender Pro 3000", "Home", 12999, 45),
    ("PAN-SET-5PC", "Non-Stick Pan Set", "Home", 9999, 70),
    ("BK-FIC-GRN-001", "The Great Novel", "Books", 2499, 120),
    ("BK-TEC-PRG-002", "Learn Programming", "Books", 4999, 90),
];

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Storefront seed data generator")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./storefront_dev.db")]
    db: String,

    /// Owner of the demo cart
    #[arg(short, long, default_value = "user-demo")]
    user: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();

    println!("🌱 Storefront Seed Data Generator");
    println!("=================================");
    println!("Database: {}", args.db);
    println!("Cart user: {}", args.user);
    println!();

    let db = Database::new(DbConfig::new(&args.db)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Products
    let mut products = Vec::with_capacity(CATALOG.len());
    for (sku, name, category, cents, stock) in CATALOG {
        let product = db
            .products()
            .insert(&demo_product(sku, name, category, *cents, *stock))
            .await?;
        products.push(product);
    }
    println!("✓ Created {} products", products.len());

    let by_sku = |sku: &str| {
        products
            .iter()
            .find(|p| p.sku == sku)
            .map(|p| p.id.clone())
            .ok_or_else(|| format!("missing seeded product {sku}"))
    };
    let phone = by_sku("IPH15PRO-256-BLK")?;
    let earbuds = by_sku("APP2-WHT")?;
    let tshirt = by_sku("TSH-COT-BLU-L")?;

    // Coupons
    let mut save20 = demo_coupon("SAVE20", DiscountKind::Percentage, 20);
    save20.min_purchase = Money::from_major(100);
    save20.max_discount = Money::from_major(50);
    save20.usage_limit = Some(100);

    let mut flat50 = demo_coupon("FLAT50", DiscountKind::Fixed, 50);
    flat50.min_purchase = Money::from_major(200);
    flat50.max_discount = Money::from_major(50);
    flat50.usage_limit = Some(50);

    let electronics = demo_coupon("ELECTRONICS15", DiscountKind::Percentage, 0);
    let electronics_rules = vec![CouponRuleRecord {
        rule_type: Some(RuleType::Product),
        product_id: Some(phone.clone()),
        discount_percentage: Some(Percentage::from_whole(15)),
        priority: 1,
        ..Default::default()
    }];

    let clothing = demo_coupon("CLOTHING25", DiscountKind::Percentage, 0);
    let clothing_rules = vec![CouponRuleRecord {
        rule_type: Some(RuleType::Category),
        category_id: Some("Clothing".to_string()),
        discount_percentage: Some(Percentage::from_whole(25)),
        priority: 2,
        ..Default::default()
    }];

    let bogo = demo_coupon("BUY2GET1", DiscountKind::BuyXGetY, 0);
    let bogo_rules = vec![CouponRuleRecord {
        rule_type: Some(RuleType::BuyXGetY),
        product_id: Some(tshirt.clone()),
        buy_quantity: Some(2),
        get_quantity: Some(1),
        priority: 3,
        ..Default::default()
    }];

    let mut mega = demo_coupon("MEGA50", DiscountKind::Percentage, 10);
    mega.min_purchase = Money::from_major(500);
    mega.max_discount = Money::from_major(200);
    mega.usage_limit = Some(20);
    let mega_rules = vec![
        CouponRuleRecord {
            rule_type: Some(RuleType::Category),
            category_id: Some("Electronics".to_string()),
            discount_percentage: Some(Percentage::from_whole(15)),
            priority: 5,
            ..Default::default()
        },
        CouponRuleRecord {
            rule_type: Some(RuleType::Category),
            category_id: Some("Home".to_string()),
            discount_percentage: Some(Percentage::from_whole(20)),
            priority: 4,
            ..Default::default()
        },
    ];

    let mut freeship = demo_coupon("FREESHIP", DiscountKind::FreeShipping, 0);
    freeship.min_purchase = Money::from_major(75);

    let coupons = [
        (save20, Vec::new()),
        (flat50, Vec::new()),
        (electronics, electronics_rules),
        (clothing, clothing_rules),
        (bogo, bogo_rules),
        (mega, mega_rules),
        (freeship, Vec::new()),
    ];
    let coupon_count = coupons.len();
    for (coupon, rules) in coupons {
        db.coupons().create(&coupon, rules).await?;
    }
    println!("✓ Created {} coupons", coupon_count);

    // Demo cart
    db.carts().add_item(&args.user, &phone, 1).await?;
    db.carts().add_item(&args.user, &earbuds, 2).await?;
    db.carts().add_item(&args.user, &tshirt, 3).await?;
    println!("✓ Filled cart for {}", args.user);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

fn demo_product(sku: &str, name: &str, category: &str, cents: i64, stock: i64) -> Product {
    let now = Utc::now();

    Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: name.to_string(),
        category: Some(category.to_string()),
        price: Money::from_cents(cents),
        stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Active for a year from yesterday, unlimited, no minimum or cap.
fn demo_coupon(code: &str, kind: DiscountKind, value: i64) -> Coupon {
    let now = Utc::now();

    Coupon {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        kind,
        value: Money::from_major(value),
        min_purchase: Money::zero(),
        max_discount: Money::zero(),
        usage_limit: None,
        usage_count: 0,
        is_active: true,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(365),
        created_at: now,
    }
}
