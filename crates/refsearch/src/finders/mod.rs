//
// finders/mod.rs
//
// Built-in text-level reference finders used by the refsearch binary
//

mod accessor;
mod identifier;

use std::sync::Arc;

pub use accessor::PropertyAccessorFinder;
pub use identifier::IdentifierReferenceFinder;

use crate::finder::ReferenceFinder;

/// The finder set the binary searches with
pub fn default_finders() -> Vec<Arc<dyn ReferenceFinder>> {
    vec![
        Arc::new(IdentifierReferenceFinder::new()),
        Arc::new(PropertyAccessorFinder::new()),
    ]
}
