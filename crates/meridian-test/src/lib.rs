//! # Meridian Test
//!
//! In-memory testing for Meridian applications. Requests go through the
//! full [`Dispatcher`](meridian_pipeline::Dispatcher) (filters, matching,
//! binding, mappers and codecs) without a server or a socket.
//!
//! ## Example
//!
//! ```ignore
//! use meridian_test::TestClient;
//! use http::StatusCode;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_add_book() {
//!     let client = TestClient::new(bookstore_dispatcher());
//!
//!     client
//!         .post("/bookstore/books")
//!         .json(&json!({"id": 3, "title": "Emma"}))
//!         .send()
//!         .await
//!         .assert_status(StatusCode::CREATED)
//!         .assert_header("location", "/bookstore/books/3");
//!
//!     client
//!         .get("/bookstore/books/3")
//!         .accept("application/json")
//!         .send()
//!         .await
//!         .assert_json_field("title", &json!("Emma"));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequest;
pub use response::TestResponse;
