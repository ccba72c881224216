use std::fmt;

use serde::Serialize;

/// Drawable category. Behavior that depends on what a primitive is matches on
/// this exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PrimitiveKind {
    Endpoint,
    ServiceLabel,
    TenantSphere,
    TenantLabel,
    MagistralSegment,
    Branch,
    Arrow,
}

impl PrimitiveKind {
    pub const ALL: [Self; 7] = [
        Self::Endpoint,
        Self::ServiceLabel,
        Self::TenantSphere,
        Self::TenantLabel,
        Self::MagistralSegment,
        Self::Branch,
        Self::Arrow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::ServiceLabel => "service-label",
            Self::TenantSphere => "tenant-sphere",
            Self::TenantLabel => "tenant-label",
            Self::MagistralSegment => "magistral",
            Self::Branch => "branch",
            Self::Arrow => "arrow",
        }
    }
}

/// Stable identity of one drawable across update passes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LogicalKey {
    Endpoint(String),
    ServiceLabel { tenant: String, service: String },
    TenantSphere(String),
    TenantLabel(String),
    MagistralSegment { source: String, target: String, index: usize },
    Branch { tenant: String, other: String, endpoint: String },
    Arrow(String),
}

impl LogicalKey {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Endpoint(_) => PrimitiveKind::Endpoint,
            Self::ServiceLabel { .. } => PrimitiveKind::ServiceLabel,
            Self::TenantSphere(_) => PrimitiveKind::TenantSphere,
            Self::TenantLabel(_) => PrimitiveKind::TenantLabel,
            Self::MagistralSegment { .. } => PrimitiveKind::MagistralSegment,
            Self::Branch { .. } => PrimitiveKind::Branch,
            Self::Arrow(_) => PrimitiveKind::Arrow,
        }
    }

    pub fn tenant(&self) -> Option<&str> {
        match self {
            Self::ServiceLabel { tenant, .. }
            | Self::TenantSphere(tenant)
            | Self::TenantLabel(tenant)
            | Self::Branch { tenant, .. } => Some(tenant),
            Self::Endpoint(_) | Self::MagistralSegment { .. } | Self::Arrow(_) => None,
        }
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(id) => write!(f, "endpoint:{id}"),
            Self::ServiceLabel { tenant, service } => write!(f, "service:{tenant}/{service}"),
            Self::TenantSphere(tenant) => write!(f, "tenant-sphere:{tenant}"),
            Self::TenantLabel(tenant) => write!(f, "tenant-label:{tenant}"),
            Self::MagistralSegment {
                source,
                target,
                index,
            } => write!(f, "magistral:{source}->{target}#{index}"),
            Self::Branch {
                tenant,
                other,
                endpoint,
            } => write!(f, "branch:{tenant}->{other}:{endpoint}"),
            Self::Arrow(id) => write!(f, "arrow:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_unique_per_variant() {
        let keys = [
            LogicalKey::Endpoint("x".to_owned()),
            LogicalKey::TenantSphere("x".to_owned()),
            LogicalKey::TenantLabel("x".to_owned()),
            LogicalKey::Arrow("x".to_owned()),
        ];
        let rendered = keys.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(
            rendered,
            ["endpoint:x", "tenant-sphere:x", "tenant-label:x", "arrow:x"]
        );
    }

    #[test]
    fn kind_matches_variant() {
        let key = LogicalKey::MagistralSegment {
            source: "a".to_owned(),
            target: "b".to_owned(),
            index: 2,
        };
        assert_eq!(key.kind(), PrimitiveKind::MagistralSegment);
        assert_eq!(key.to_string(), "magistral:a->b#2");
        assert_eq!(key.tenant(), None);

        let label = LogicalKey::ServiceLabel {
            tenant: "t".to_owned(),
            service: "api".to_owned(),
        };
        assert_eq!(label.kind(), PrimitiveKind::ServiceLabel);
        assert_eq!(label.tenant(), Some("t"));
    }
}
