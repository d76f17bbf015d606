// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;

use crate::{ApiResult, DeleteReference, EntityKind, Record};

/// Backend for one entity kind. Calls block the calling thread; screens run
/// them on worker threads and apply the results on their own thread.
pub trait EntityApi: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Full collection, narrowed to records whose ID matches `filter` when one
    /// is given.
    fn list(&self, filter: Option<&str>) -> ApiResult<Vec<Record>>;
    fn get_by_id(&self, id: &str) -> ApiResult<Record>;
    fn create(&self, record: &Record) -> ApiResult<Record>;
    fn update(&self, id: &str, record: &Record) -> ApiResult<Record>;
    fn delete(&self, id: &str) -> ApiResult<()>;
    /// Records that reference `id`. Empty means the delete touches nothing else.
    fn check_delete(&self, id: &str) -> ApiResult<Vec<DeleteReference>>;
}

impl<T: EntityApi + ?Sized> EntityApi for Arc<T> {
    fn kind(&self) -> EntityKind {
        (**self).kind()
    }

    fn list(&self, filter: Option<&str>) -> ApiResult<Vec<Record>> {
        (**self).list(filter)
    }

    fn get_by_id(&self, id: &str) -> ApiResult<Record> {
        (**self).get_by_id(id)
    }

    fn create(&self, record: &Record) -> ApiResult<Record> {
        (**self).create(record)
    }

    fn update(&self, id: &str, record: &Record) -> ApiResult<Record> {
        (**self).update(id, record)
    }

    fn delete(&self, id: &str) -> ApiResult<()> {
        (**self).delete(id)
    }

    fn check_delete(&self, id: &str) -> ApiResult<Vec<DeleteReference>> {
        (**self).check_delete(id)
    }
}
