/// Data layer: columnar model and typed schema registry.
///
/// Architecture:
/// ```text
///   locator ──▶ reader ──▶ FileHandle (footer schema + ntuple path)
///                              │
///                              ▼
///                        ┌──────────┐
///                        │ importer │  projected read → EventCollection
///                        └──────────┘
///                              │
///                              ▼
///                     ┌────────────────┐
///                     │ EventCollection │  named scalar/jagged columns
///                     └────────────────┘
///                              │
///                              ▼
///                        select / vector / hist consume, never mutate
/// ```
pub mod model;
pub mod schema;
