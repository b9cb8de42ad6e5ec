//! Run identifiers
//!
//! Every scenario run gets its own id, recorded on the run span and in the
//! report. UUID v7 keeps ids from back-to-back runs sortable by start time.

use nutype::nutype;
use uuid::Uuid;

#[nutype(derive(Debug, Clone, PartialEq, Eq, Serialize, Display, AsRef))]
pub struct RunId(Uuid);

impl RunId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}
