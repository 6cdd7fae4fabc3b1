//! The option type library.
//!
//! Every option kind is a variant of [`ConfigOption`], which implements the
//! shared [`Validate`] capability by delegating to the variant. Embedders
//! that need their own option kind use [`ConfigOption::Custom`].

mod basic;
mod extensions;
mod network;
mod paths;
mod repo;
mod structure;
mod theme;

use std::sync::Arc;

use serde_yaml::Value;

use super::base::{Config, Pass, Validate};
use super::errors::ValidationError;

pub use basic::{Any, Choice, Deprecated, Kind, Private, Type};
pub use extensions::{Hooks, MarkdownExtensions, Plugins};
pub use network::{Address, IpAddress, Url};
pub use paths::{DocsDir, FilesystemObject, ListOfPaths, PathKind, SiteDir};
pub use repo::{EditTemplate, EditUri, EditUriTemplate, RepoName};
pub use structure::{ListOfItems, Nav, SubConfig, config_items};
pub use theme::{Locale, Theme, ThemeSettings};

/// One named configuration entry's contract.
#[derive(Debug, Clone)]
pub enum ConfigOption {
    Any(Any),
    Type(Type),
    Choice(Choice),
    Private(Private),
    Deprecated(Deprecated),
    Url(Url),
    IpAddress(IpAddress),
    FilesystemObject(FilesystemObject),
    DocsDir(DocsDir),
    SiteDir(SiteDir),
    ListOfPaths(ListOfPaths),
    SubConfig(SubConfig),
    ListOfItems(ListOfItems),
    Nav(Nav),
    RepoName(RepoName),
    EditUri(EditUri),
    EditUriTemplate(EditUriTemplate),
    Theme(Theme),
    MarkdownExtensions(MarkdownExtensions),
    Plugins(Plugins),
    Hooks(Hooks),
    /// An option kind defined outside this crate.
    Custom(Arc<dyn Validate>),
}

macro_rules! dispatch {
    ($self:ident, $option:ident => $call:expr) => {
        match $self {
            ConfigOption::Any($option) => $call,
            ConfigOption::Type($option) => $call,
            ConfigOption::Choice($option) => $call,
            ConfigOption::Private($option) => $call,
            ConfigOption::Deprecated($option) => $call,
            ConfigOption::Url($option) => $call,
            ConfigOption::IpAddress($option) => $call,
            ConfigOption::FilesystemObject($option) => $call,
            ConfigOption::DocsDir($option) => $call,
            ConfigOption::SiteDir($option) => $call,
            ConfigOption::ListOfPaths($option) => $call,
            ConfigOption::SubConfig($option) => $call,
            ConfigOption::ListOfItems($option) => $call,
            ConfigOption::Nav($option) => $call,
            ConfigOption::RepoName($option) => $call,
            ConfigOption::EditUri($option) => $call,
            ConfigOption::EditUriTemplate($option) => $call,
            ConfigOption::Theme($option) => $call,
            ConfigOption::MarkdownExtensions($option) => $call,
            ConfigOption::Plugins($option) => $call,
            ConfigOption::Hooks($option) => $call,
            ConfigOption::Custom($option) => $call,
        }
    };
}

impl Validate for ConfigOption {
    fn is_required(&self) -> bool {
        dispatch!(self, option => option.is_required())
    }

    fn default_value(&self) -> Option<Value> {
        dispatch!(self, option => option.default_value())
    }

    fn pre_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        dispatch!(self, option => option.pre_validation(pass, config, key))
    }

    fn run_validation(&self, pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        dispatch!(self, option => option.run_validation(pass, value))
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        dispatch!(self, option => option.post_validation(pass, config, key))
    }
}

macro_rules! impl_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ConfigOption {
                fn from(option: $variant) -> Self {
                    ConfigOption::$variant(option)
                }
            }
        )*
    };
}

impl_from!(
    Any,
    Type,
    Choice,
    Private,
    Deprecated,
    Url,
    IpAddress,
    FilesystemObject,
    DocsDir,
    SiteDir,
    ListOfPaths,
    SubConfig,
    ListOfItems,
    Nav,
    RepoName,
    EditUri,
    EditUriTemplate,
    Theme,
    MarkdownExtensions,
    Plugins,
    Hooks,
);

/// Builder methods shared by options that carry `required` and `default`.
macro_rules! requirement_builders {
    ($ty:ty) => {
        impl $ty {
            /// Treat a null value as an error.
            pub fn required(mut self) -> Self {
                self.required = true;
                self
            }

            /// Value used when the option is absent or null.
            pub fn default(mut self, value: impl Into<serde_yaml::Value>) -> Self {
                self.default = Some(value.into());
                self
            }
        }
    };
}

pub(crate) use requirement_builders;
