use std::fmt;

macro_rules! token_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a token from any string-like value.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the token text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return `true` for the empty token.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

token_type!(
    /// Identifier of a backend plugin. The empty id means "registry default".
    BackendId
);

token_type!(
    /// Name of an arbitrary output variable (`color`, `depth`, ...).
    AovId
);

token_type!(
    /// Purpose label used to filter rprims per pass (`geometry`, `render`, `guide`, `proxy`).
    RenderTag
);

impl AovId {
    /// Beauty output.
    pub fn color() -> Self {
        Self::new("color")
    }

    /// Camera-space depth output.
    pub fn depth() -> Self {
        Self::new("depth")
    }

    /// Per-pixel rprim id output.
    pub fn prim_id() -> Self {
        Self::new("primId")
    }
}

impl RenderTag {
    /// Ordinary renderable geometry.
    pub fn geometry() -> Self {
        Self::new("geometry")
    }

    /// Geometry authored for final renders.
    pub fn render() -> Self {
        Self::new("render")
    }

    /// Viewport guides.
    pub fn guide() -> Self {
        Self::new("guide")
    }

    /// Lightweight stand-ins for render geometry.
    pub fn proxy() -> Self {
        Self::new("proxy")
    }
}
