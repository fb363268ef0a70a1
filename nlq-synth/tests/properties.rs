use nlq_schema::demo::demo_catalog;
use nlq_schema::{define_catalog, Catalog};
use nlq_synth::{synthesize, SynthError, SynthOptions};
use nlq_types::{
    AggregateIntent, Aggregation, Filter, FilterValue, JoinIntent, Operator, PlaceholderStyle,
    QueryIntent, SelectIntent, SortDirection, SqlValue,
};

/// `orders` references `products` twice, so the pair has two join paths.
fn gift_catalog() -> Catalog {
    define_catalog! {
        table products {
            id: Number [primary_key],
            name: String,
            price: Number,
        }
        table orders {
            id: Number [primary_key],
            product_id: Number,
            gift_product_id: Number [nullable],
            customer_city: String,
        }
        relationships {
            orders.product_id -> products.id,
            orders.gift_product_id -> products.id,
        }
    }
    .unwrap()
}

fn sample_intents() -> Vec<QueryIntent> {
    vec![
        SelectIntent::new("orders")
            .filter(Filter::compare("customer_city", Operator::Equals, "New York"))
            .into(),
        SelectIntent::new("customers")
            .column("gender")
            .column("age")
            .filter(Filter::between("age", 20i64, 30i64))
            .filter(Filter::compare("preferred_category", Operator::Contains, "Elec_tronics%"))
            .order_by("spending score", SortDirection::Desc)
            .limit(5)
            .into(),
        SelectIntent::new("products")
            .filter(Filter::in_list(
                "category",
                vec![SqlValue::from("books"), SqlValue::from("toys")],
            ))
            .filter(Filter::compare("in_stock", Operator::Equals, "yes"))
            .distinct()
            .into(),
        AggregateIntent::new("orders", Aggregation::Sum, Some("total"))
            .group_by("customer_city")
            .filter(Filter::compare("order_date", Operator::AtLeast, "2024-01-01"))
            .into(),
        JoinIntent::new("customers", "products")
            .aggregate(Aggregation::Count, None)
            .filter(Filter::compare("products.price", Operator::LessThan, 9.5))
            .filter(Filter::compare("gender", Operator::NotEquals, "Male"))
            .into(),
    ]
}

#[test]
fn placeholder_count_matches_bound_values() {
    let catalog = demo_catalog().unwrap();
    for style in [
        PlaceholderStyle::Question,
        PlaceholderStyle::Numbered,
        PlaceholderStyle::Dollar,
    ] {
        let options = SynthOptions::default().with_style(style);
        for intent in sample_intents() {
            let stmt = synthesize(&intent, &catalog, &options).unwrap();
            assert_eq!(
                stmt.placeholder_count(),
                stmt.params.len(),
                "{style:?}: {}",
                stmt.text
            );
        }
    }
}

#[test]
fn literals_never_appear_in_statement_text() {
    let catalog = demo_catalog().unwrap();
    for intent in sample_intents() {
        let stmt = synthesize(&intent, &catalog, &SynthOptions::default()).unwrap();
        for filter in intent.filters() {
            let literals = match &filter.value {
                FilterValue::None => vec![],
                FilterValue::Single(v) => vec![v.clone()],
                FilterValue::Range(lo, hi) => vec![lo.clone(), hi.clone()],
                FilterValue::List(vs) => vs.clone(),
            };
            for literal in literals {
                let text = literal.to_string();
                assert!(
                    !stmt.text.contains(&text),
                    "literal `{text}` leaked into `{}`",
                    stmt.text
                );
            }
        }
    }
}

#[test]
fn synthesis_is_idempotent() {
    let catalog = demo_catalog().unwrap();
    let options = SynthOptions::default().with_style(PlaceholderStyle::Dollar);
    for intent in sample_intents() {
        let first = synthesize(&intent, &catalog, &options).unwrap();
        let second = synthesize(&intent, &catalog, &options).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.params, second.params);
    }
}

#[test]
fn city_filter_binds_one_value() {
    let catalog = gift_catalog();
    let intent: QueryIntent = SelectIntent::new("orders")
        .filter(Filter::compare("customer_city", Operator::Equals, "New York"))
        .into();

    let stmt = synthesize(&intent, &catalog, &SynthOptions::unlimited()).unwrap();
    assert_eq!(
        stmt.text,
        r#"SELECT * FROM "orders" WHERE "customer_city" = ?"#
    );
    assert_eq!(stmt.params, vec![SqlValue::from("New York")]);
    assert_eq!(stmt.placeholder_count(), 1);

    let limited = synthesize(&intent, &catalog, &SynthOptions::default()).unwrap();
    assert_eq!(
        limited.text,
        r#"SELECT * FROM "orders" WHERE "customer_city" = ? LIMIT ?"#
    );
    assert_eq!(
        limited.params,
        vec![SqlValue::from("New York"), SqlValue::Integer(1000)]
    );
}

#[test]
fn misspelled_table_is_unknown() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = SelectIntent::new("custmers").into();
    assert_eq!(
        synthesize(&intent, &catalog, &SynthOptions::default()),
        Err(SynthError::UnknownTable("custmers".into()))
    );
}

#[test]
fn unknown_column_names_the_table() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = SelectIntent::new("customers").column("height").into();
    assert_eq!(
        synthesize(&intent, &catalog, &SynthOptions::default()),
        Err(SynthError::UnknownColumn {
            table: "customers".into(),
            column: "height".into(),
        })
    );
}

#[test]
fn two_foreign_key_paths_are_ambiguous() {
    let catalog = gift_catalog();
    let intent: QueryIntent = JoinIntent::new("orders", "products").into();
    match synthesize(&intent, &catalog, &SynthOptions::default()) {
        Err(SynthError::AmbiguousJoin { from, to, paths }) => {
            assert_eq!(from, "orders");
            assert_eq!(to, "products");
            assert_eq!(paths.len(), 2);
        }
        other => panic!("expected AmbiguousJoin, got {other:?}"),
    }
}

#[test]
fn via_hint_selects_one_path() {
    let catalog = gift_catalog();
    let intent: QueryIntent = JoinIntent::new("orders", "products")
        .via("gift_product_id")
        .column("products.name")
        .column("customer_city")
        .into();
    let stmt = synthesize(&intent, &catalog, &SynthOptions::unlimited()).unwrap();
    assert_eq!(
        stmt.text,
        r#"SELECT "products"."name", "orders"."customer_city" FROM "orders" JOIN "products" ON "orders"."gift_product_id" = "products"."id""#
    );

    let unmatched: QueryIntent = JoinIntent::new("orders", "products").via("price").into();
    assert!(matches!(
        synthesize(&unmatched, &catalog, &SynthOptions::default()),
        Err(SynthError::NoJoinPath { .. })
    ));
}

#[test]
fn sum_over_text_column_is_unsupported() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = AggregateIntent::new("customers", Aggregation::Sum, Some("gender")).into();
    assert!(matches!(
        synthesize(&intent, &catalog, &SynthOptions::default()),
        Err(SynthError::UnsupportedIntent(_))
    ));
}

#[test]
fn two_hop_join_goes_through_orders() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = JoinIntent::new("customers", "products")
        .column("customers.gender")
        .column("products.name")
        .filter(Filter::compare("products.category", Operator::Equals, "books"))
        .limit(10)
        .into();
    let stmt = synthesize(&intent, &catalog, &SynthOptions::default()).unwrap();
    assert_eq!(
        stmt.text,
        concat!(
            r#"SELECT "customers"."gender", "products"."name" FROM "customers" "#,
            r#"JOIN "orders" ON "customers"."customerid" = "orders"."customer_id" "#,
            r#"JOIN "products" ON "orders"."product_id" = "products"."product_id" "#,
            r#"WHERE "products"."category" = ? LIMIT ?"#
        )
    );
    assert_eq!(
        stmt.params,
        vec![SqlValue::from("books"), SqlValue::Integer(10)]
    );
}

#[test]
fn unqualified_column_present_in_both_tables_is_ambiguous() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = JoinIntent::new("orders", "products")
        .column("product_id")
        .into();
    assert!(matches!(
        synthesize(&intent, &catalog, &SynthOptions::default()),
        Err(SynthError::AmbiguousReference { .. })
    ));
}

#[test]
fn self_join_is_unsupported() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = JoinIntent::new("orders", "purchases").into();
    assert!(matches!(
        synthesize(&intent, &catalog, &SynthOptions::default()),
        Err(SynthError::UnsupportedIntent(_))
    ));
}

#[test]
fn filter_type_rules() {
    let catalog = demo_catalog().unwrap();
    let reject = |filter: Filter, table: &str| {
        let intent: QueryIntent = SelectIntent::new(table).filter(filter).into();
        synthesize(&intent, &catalog, &SynthOptions::default())
    };

    assert!(matches!(
        reject(Filter::compare("age", Operator::Contains, "3"), "customers"),
        Err(SynthError::UnsupportedIntent(_))
    ));
    assert!(matches!(
        reject(Filter::compare("in_stock", Operator::GreaterThan, true), "products"),
        Err(SynthError::UnsupportedIntent(_))
    ));
    assert!(matches!(
        reject(Filter::compare("age", Operator::Equals, "thirty"), "customers"),
        Err(SynthError::UnsupportedIntent(_))
    ));
    assert!(matches!(
        reject(Filter::compare("age", Operator::Equals, SqlValue::Null), "customers"),
        Err(SynthError::UnsupportedIntent(_))
    ));
    assert!(matches!(
        reject(
            Filter::new(
                nlq_types::ColumnRef::new("age"),
                Operator::Between,
                FilterValue::Single(SqlValue::Integer(3))
            ),
            "customers"
        ),
        Err(SynthError::UnsupportedIntent(_))
    ));
    assert!(matches!(
        reject(Filter::compare("order_date", Operator::Equals, "last week"), "orders"),
        Err(SynthError::UnsupportedIntent(_))
    ));
}

#[test]
fn contains_is_case_insensitive_and_escaped() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = SelectIntent::new("customers")
        .filter(Filter::compare("category", Operator::Contains, "Home_Garden"))
        .into();
    let stmt = synthesize(&intent, &catalog, &SynthOptions::unlimited()).unwrap();
    assert_eq!(
        stmt.text,
        r#"SELECT * FROM "customers" WHERE LOWER("preferred_category") LIKE ? ESCAPE '\'"#
    );
    assert_eq!(stmt.params, vec![SqlValue::from(r"%home\_garden%")]);
}

#[test]
fn null_checks_bind_nothing() {
    let catalog = demo_catalog().unwrap();
    let intent: QueryIntent = SelectIntent::new("customers")
        .filter(Filter::new(
            nlq_types::ColumnRef::new("age_group"),
            Operator::IsNull,
            FilterValue::None,
        ))
        .into();
    let stmt = synthesize(&intent, &catalog, &SynthOptions::unlimited()).unwrap();
    assert_eq!(
        stmt.text,
        r#"SELECT * FROM "customers" WHERE "age_group" IS NULL"#
    );
    assert!(stmt.params.is_empty());
}
