//! Demo database matching `nlq_schema::demo::demo_catalog`.

pub const DEMO_SEED_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
  customerid INTEGER PRIMARY KEY,
  gender TEXT NOT NULL,
  age INTEGER NOT NULL,
  annual_income_k REAL NOT NULL,
  spending_score INTEGER NOT NULL,
  credit_score INTEGER,
  loyalty_years INTEGER,
  preferred_category TEXT,
  age_group TEXT,
  estimated_savings_k REAL
);

CREATE TABLE IF NOT EXISTS products (
  product_id INTEGER PRIMARY KEY,
  name TEXT NOT NULL,
  category TEXT NOT NULL,
  price REAL NOT NULL,
  in_stock BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
  order_id INTEGER PRIMARY KEY,
  customer_id INTEGER NOT NULL REFERENCES customers(customerid),
  product_id INTEGER NOT NULL REFERENCES products(product_id),
  quantity INTEGER NOT NULL,
  total REAL NOT NULL,
  order_date DATE NOT NULL,
  customer_city TEXT NOT NULL
);

INSERT OR IGNORE INTO customers VALUES
  (1, 'Male', 19, 15, 39, 652, 1, 'Electronics', '18-25', 2.3),
  (2, 'Male', 21, 15, 81, 590, 2, 'Clothing', '18-25', 1.1),
  (3, 'Female', 20, 16, 6, 701, 1, 'Groceries', '18-25', 4.8),
  (4, 'Female', 23, 16, 77, 615, 3, 'Clothing', '18-25', 0.9),
  (5, 'Female', 31, 17, 40, 688, 4, 'Home', '26-35', 6.2),
  (6, 'Female', 22, 17, 76, 602, 2, 'Electronics', '18-25', 1.5),
  (7, 'Female', 35, 18, 6, 745, 6, 'Groceries', '26-35', 9.4),
  (8, 'Female', 23, 18, 94, 580, 1, 'Clothing', '18-25', 0.4),
  (9, 'Male', 64, 19, 3, 790, 12, 'Home', '56+', 48.0),
  (10, 'Female', 30, 19, 72, 640, 3, 'Electronics', '26-35', 3.7),
  (11, 'Male', 67, 19, 14, 810, 15, 'Groceries', '56+', 61.5),
  (12, 'Female', 35, 19, 99, 598, 5, 'Clothing', '26-35', 2.0),
  (13, 'Female', 58, 20, 15, 760, 10, 'Home', '56+', 38.2),
  (14, 'Female', 24, 20, 77, 620, 2, 'Electronics', '18-25', 1.2),
  (15, 'Male', 37, 20, 13, 705, 7, 'Sports', '36-45', 14.6),
  (16, 'Male', 22, 20, 79, 575, NULL, 'Sports', '18-25', NULL),
  (17, 'Female', 35, 21, 35, 690, 6, NULL, '26-35', 8.8),
  (18, 'Male', 20, 21, 66, NULL, 1, 'Electronics', '18-25', 0.7),
  (19, 'Male', 52, 23, 29, 735, 9, 'Home', '46-55', 25.1),
  (20, 'Female', 35, 23, 98, 610, 4, 'Clothing', '26-35', 3.3),
  (21, 'Male', 48, 78, 22, 780, 11, 'Sports', '46-55', 96.0),
  (22, 'Female', 41, 87, 92, 720, 8, 'Electronics', '36-45', 54.4),
  (23, 'Male', 45, 103, 69, 800, 13, 'Home', '36-45', 120.3),
  (24, 'Female', 29, 120, 79, 742, 5, 'Clothing', '26-35', 72.9);

INSERT OR IGNORE INTO products VALUES
  (1, 'Wireless Headphones', 'Electronics', 89.99, 1),
  (2, 'Running Shoes', 'Sports', 64.5, 1),
  (3, 'Denim Jacket', 'Clothing', 49.0, 0),
  (4, 'Espresso Machine', 'Home', 219.0, 1),
  (5, 'Organic Coffee Beans', 'Groceries', 14.25, 1),
  (6, 'Smart Watch', 'Electronics', 179.0, 0),
  (7, 'Yoga Mat', 'Sports', 25.0, 1),
  (8, 'Linen Sheets', 'Home', 95.0, 1);

INSERT OR IGNORE INTO orders VALUES
  (1, 1, 1, 1, 89.99, '2024-01-05', 'New York'),
  (2, 2, 3, 2, 98.0, '2024-01-07', 'Chicago'),
  (3, 4, 3, 1, 49.0, '2024-01-12', 'New York'),
  (4, 5, 4, 1, 219.0, '2024-01-19', 'Boston'),
  (5, 7, 5, 4, 57.0, '2024-02-02', 'Seattle'),
  (6, 9, 8, 2, 190.0, '2024-02-10', 'Boston'),
  (7, 10, 6, 1, 179.0, '2024-02-14', 'New York'),
  (8, 12, 3, 3, 147.0, '2024-02-21', 'Austin'),
  (9, 15, 2, 1, 64.5, '2024-03-01', 'Chicago'),
  (10, 16, 7, 2, 50.0, '2024-03-03', 'Austin'),
  (11, 18, 1, 1, 89.99, '2024-03-09', 'Seattle'),
  (12, 21, 2, 2, 129.0, '2024-03-15', 'Denver'),
  (13, 22, 6, 1, 179.0, '2024-03-22', 'New York'),
  (14, 23, 4, 1, 219.0, '2024-04-02', 'Chicago'),
  (15, 24, 8, 1, 95.0, '2024-04-11', 'New York'),
  (16, 3, 5, 6, 85.5, '2024-04-18', 'Denver');
"#;
