//! Declarative catalog definitions.
//!
//! ```
//! let catalog = nlq_schema::define_catalog! {
//!     table customers as ["clients"] {
//!         id: Number [primary_key],
//!         city: String [nullable] as ["town"],
//!     }
//!     table orders {
//!         id: Number [primary_key],
//!         customer_id: Number,
//!     }
//!     relationships {
//!         orders.customer_id -> customers.id,
//!     }
//! }
//! .unwrap();
//! assert_eq!(catalog.table_names(), vec!["customers", "orders"]);
//! ```
//!
//! Expands to [`Catalog::new`](crate::Catalog::new), so the result is validated
//! like any other catalog.

/// Apply column flags (`primary_key`, `nullable`) to a column expression.
#[doc(hidden)]
#[macro_export]
macro_rules! __column_flags {
    ( $column:expr $(,)? ) => { $column };
    ( $column:expr, primary_key $(, $rest:ident)* ) => {
        $crate::__column_flags!($column.primary_key() $(, $rest)*)
    };
    ( $column:expr, nullable $(, $rest:ident)* ) => {
        $crate::__column_flags!($column.nullable() $(, $rest)*)
    };
    ( $column:expr, $other:ident $(, $rest:ident)* ) => {
        compile_error!(concat!("unknown column flag `", stringify!($other), "`"))
    };
}

/// Build a `Result<Catalog, CatalogError>` from table and relationship declarations.
#[macro_export]
macro_rules! define_catalog {
    (
        $(
            table $table:ident $( as [ $( $talias:literal ),* $(,)? ] )? {
                $(
                    $col:ident : $ty:ident
                    $( [ $( $flag:ident ),* $(,)? ] )?
                    $( as [ $( $calias:literal ),* $(,)? ] )?
                ),* $(,)?
            }
        )*
        $(
            relationships {
                $( $ft:ident . $fc:ident -> $tt:ident . $tc:ident ),* $(,)?
            }
        )?
    ) => {
        $crate::Catalog::new(
            vec![
                $(
                    $crate::Table::new(stringify!($table))
                        $( $( .with_alias($talias) )* )?
                        $(
                            .with_column($crate::__column_flags!(
                                $crate::Column::new(stringify!($col), $crate::ColumnType::$ty)
                                    $( $( .with_alias($calias) )* )?
                                $( , $( $flag ),* )?
                            ))
                        )*
                ),*
            ],
            vec![
                $( $(
                    $crate::Relationship::new(
                        stringify!($ft),
                        stringify!($fc),
                        stringify!($tt),
                        stringify!($tc),
                    )
                ),* )?
            ],
        )
    };
}
