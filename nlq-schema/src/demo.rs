//! Built-in catalog used when no database or catalog file is configured, and
//! by the `demo` CLI command. Matches the seed data shipped with `nlq-store`.

use crate::{define_catalog, AliasOverlay, Catalog, CatalogError};

const DEMO_QUALIFIERS: &str = r#"
tables:
  customers:
    qualifiers:
      gender:
        - { phrase: female, value: Female }
        - { phrase: females, value: Female }
        - { phrase: women, value: Female }
        - { phrase: woman, value: Female }
        - { phrase: male, value: Male }
        - { phrase: males, value: Male }
        - { phrase: men, value: Male }
        - { phrase: man, value: Male }
      spending_score:
        - { phrase: high spending, operator: greater_than, value: 70 }
        - { phrase: low spending, operator: less_than, value: 30 }
      annual_income_k:
        - { phrase: high income, operator: greater_than, value: 70 }
        - { phrase: low income, operator: less_than, value: 20 }
  products:
    qualifiers:
      in_stock:
        - { phrase: available, value: true }
"#;

pub fn demo_catalog() -> Result<Catalog, CatalogError> {
    let qualifiers = AliasOverlay::from_yaml_str(DEMO_QUALIFIERS)?;
    let catalog = define_catalog! {
        table customers as ["clients", "people", "users"] {
            customerid: Number [primary_key] as ["id", "customer id", "client id"],
            gender: String as ["sex"],
            age: Number as ["years old"],
            annual_income_k: Number as ["income", "annual income", "salary", "earnings"],
            spending_score: Number as ["spending", "spending score", "spend score"],
            credit_score: Number [nullable] as ["credit", "credit rating"],
            loyalty_years: Number [nullable] as ["loyalty", "years of loyalty"],
            preferred_category: String [nullable] as ["category", "shopping category"],
            age_group: String [nullable] as ["generation"],
            estimated_savings_k: Number [nullable] as ["savings", "estimated savings"],
        }
        table products as ["items"] {
            product_id: Number [primary_key] as ["id"],
            name: String as ["product name", "title"],
            category: String,
            price: Number as ["cost"],
            in_stock: Boolean as ["available"],
        }
        table orders as ["purchases", "sales"] {
            order_id: Number [primary_key] as ["id"],
            customer_id: Number,
            product_id: Number,
            quantity: Number as ["qty"],
            total: Number as ["amount", "order total"],
            order_date: Date as ["date", "ordered on"],
            customer_city: String as ["city"],
        }
        relationships {
            orders.customer_id -> customers.customerid,
            orders.product_id -> products.product_id,
        }
    }?;
    catalog.with_overlay(&qualifiers)
}
