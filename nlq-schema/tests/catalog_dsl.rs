use nlq_schema::{define_catalog, Catalog, CatalogError, ColumnType, Resolution};

#[test]
fn macro_catalog_carries_flags_and_aliases() {
    let catalog = define_catalog! {
        table authors as ["writers"] {
            id: Number [primary_key],
            name: String as ["full name"],
            born: Date [nullable],
        }
        table books {
            id: Number [primary_key],
            author_id: Number,
            title: String,
            in_print: Boolean,
        }
        relationships {
            books.author_id -> authors.id,
        }
    }
    .unwrap();

    let authors = catalog.resolve_table("writers").found().unwrap();
    assert_eq!(authors.name, "authors");
    assert!(authors.find_column("id").unwrap().primary_key);
    assert!(authors.find_column("born").unwrap().nullable);
    assert_eq!(
        authors.resolve_column("Full Name"),
        Resolution::Found(authors.find_column("name").unwrap())
    );

    let books = catalog.table("books").unwrap();
    assert!(books.find_column("author_id").unwrap().foreign_key);
    assert_eq!(books.find_column("in_print").unwrap().data_type, ColumnType::Boolean);
}

#[test]
fn macro_catalog_is_validated() {
    let result = define_catalog! {
        table a { id: Number [primary_key] }
        table b { id: Number, a_ref: Number }
        relationships { a.id -> b.id }
    };
    assert!(matches!(result, Err(CatalogError::TargetNotPrimaryKey { .. })));
}

#[test]
fn yaml_round_trip_preserves_catalog() {
    let catalog = nlq_schema::demo::demo_catalog().unwrap();
    let yaml = catalog.to_yaml_string().unwrap();
    let back = Catalog::from_yaml_str(&yaml).unwrap();
    assert_eq!(back, catalog);
}

#[test]
fn schema_serializes_to_json_for_clients() {
    let catalog = nlq_schema::demo::demo_catalog().unwrap();
    let json = serde_json::to_value(&catalog).unwrap();
    assert_eq!(json["tables"][0]["name"], "customers");
    assert_eq!(json["relationships"][0]["to_table"], "customers");
}
