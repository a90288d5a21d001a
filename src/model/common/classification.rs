use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// A security label on the total order `public < internal < confidential`.
///
/// Attached to resources as a classification and to principals as a
/// clearance; access requires clearance >= classification. The derived
/// `Ord` is the lattice order, so `max` picks the stricter label.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Confidential => "confidential",
        })
    }
}

impl From<Classification> for Bson {
    fn from(classification: Classification) -> Self {
        to_bson(&classification).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_order() {
        assert!(Classification::Public < Classification::Internal);
        assert!(Classification::Internal < Classification::Confidential);
        assert_eq!(
            Classification::Internal.max(Classification::Public),
            Classification::Internal
        );
    }
}
