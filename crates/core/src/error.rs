use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::{IdError, ShapeError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
