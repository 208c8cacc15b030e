use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Confidence {
    High => "high",
    Medium => "medium",
    Low => "low",
});

// Rendering marker the editor puts on a node after a verification.
str_enum!(NodeClass {
    Verified => "verified",
    Unverified => "unverified",
});

str_enum!(NodeStatus {
    Unverified => "unverified",
    Verified => "verified",
    Flagged => "flagged",
});

str_enum!(EvidenceStatus {
    Found => "found",
    NoResults => "no_results",
    Unavailable => "unavailable",
});

// In-flight model request on a node.
str_enum!(RequestKind {
    Verify => "verify",
    Regenerate => "regenerate",
});

str_enum!(ExportFormat {
    Pdf => "pdf",
    Jpeg => "jpeg",
});

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Pdf => "mindmap.pdf",
            Self::Jpeg => "mindmap.jpeg",
        }
    }
}
