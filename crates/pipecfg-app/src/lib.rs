// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod api;
pub mod codec;
pub mod error;
pub mod guard;
pub mod ids;
pub mod model;
pub mod schema;
pub mod screen;
pub mod view;

pub use api::*;
pub use codec::*;
pub use error::*;
pub use guard::*;
pub use ids::*;
pub use model::*;
pub use schema::*;
pub use screen::*;
pub use view::*;
