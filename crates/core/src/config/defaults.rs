//! The schema of a quire project's `quire.yml`.

use serde_yaml::Value;

use super::base::Schema;
use super::errors::OptionError;
use super::options::{
    Choice, ConfigOption, Deprecated, DocsDir, EditUri, EditUriTemplate, Hooks, IpAddress, Kind,
    ListOfItems, ListOfPaths, MarkdownExtensions, Nav, Plugins, Private, RepoName, SiteDir,
    SubConfig, Theme, Type, Url,
};

/// How a link or file problem found during the build is reported.
fn report_level() -> Result<ConfigOption, OptionError> {
    Ok(Choice::new(["warn", "info", "ignore"])?.default("info")?.into())
}

fn empty_list() -> Value {
    Value::Sequence(Vec::new())
}

/// The full set of options understood by quire, in validation order.
pub fn schema() -> Result<Schema, OptionError> {
    let validation = Schema::try_new([
        ("omitted_files", report_level()?),
        ("absolute_links", report_level()?),
        ("unrecognized_links", report_level()?),
    ])?;

    Schema::try_new([
        ("site_name", ConfigOption::from(Type::new(Kind::Str).required())),
        ("nav", Nav::new().into()),
        ("pages", Deprecated::new().moved_to("nav").into()),
        ("site_url", Url::new().is_dir().into()),
        ("site_description", Type::new(Kind::Str).into()),
        ("site_author", Type::new(Kind::Str).into()),
        ("theme", Theme::new().default("quire").into()),
        ("docs_dir", DocsDir::new().default("docs").into()),
        ("site_dir", SiteDir::new().default("site").into()),
        ("copyright", Type::new(Kind::Str).into()),
        ("google_analytics", Deprecated::new().removed().into()),
        ("dev_addr", IpAddress::new().default("127.0.0.1:8000").into()),
        ("use_directory_urls", Type::new(Kind::Bool).default(true).into()),
        ("repo_url", Url::new().into()),
        ("repo_name", RepoName::new("repo_url").into()),
        ("edit_uri_template", EditUriTemplate::new("edit_uri").into()),
        ("edit_uri", EditUri::new("repo_url").into()),
        ("extra_css", ListOfItems::new(Type::new(Kind::Str)).default(empty_list()).into()),
        ("extra_javascript", ListOfItems::new(Type::new(Kind::Str)).default(empty_list()).into()),
        ("extra_templates", Type::new(Kind::List).default(empty_list()).into()),
        (
            "markdown_extensions",
            MarkdownExtensions::new().builtins(["toc", "tables", "fenced_code"]).into(),
        ),
        ("mdx_configs", Private::new().into()),
        ("strict", Type::new(Kind::Bool).default(false).into()),
        ("remote_branch", Type::new(Kind::Str).default("gh-pages").into()),
        ("remote_name", Type::new(Kind::Str).default("origin").into()),
        ("extra", SubConfig::open().into()),
        ("plugins", Plugins::new().default(vec!["search"]).hooks_key("hooks").into()),
        ("hooks", Hooks::new("plugins").into()),
        ("watch", ListOfPaths::new().default(empty_list()).into()),
        ("validation", SubConfig::validated(validation).into()),
    ])
}
