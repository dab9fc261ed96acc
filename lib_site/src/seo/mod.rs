//! # SEO Injection
//!
//! Works out the meta tags for a requested page and rewrites the `<head>` of
//! the pre-built HTML shell with them.
//!
//! ## Resolution order (per field)
//!
//! 1. An admin-configured `seo` record whose `path` (or `id`) is the page path.
//! 2. The entity behind a detail route (`/services/{id}`, `/cases/{id}`,
//!    `/blog/{id}`, `/packages/{id}`), matched by id or slug.
//! 3. The stored site settings.
//! 4. The hard-coded defaults below.
//!
//! Resolution is pure: the caller loads the records and this module only
//! decides. Rewriting lives in [`inject`].

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::content::{BlogPost, CaseStudy, Collection, Package, SeoEntry, Service, SiteSettings};

/// Regex-based rewriting of the HTML head.
pub mod inject;

pub use inject::inject;

pub const DEFAULT_SITE_NAME: &str = "Brightpath Marketing";
pub const DEFAULT_TITLE: &str = "Brightpath Marketing | Digital Marketing Agency";
pub const DEFAULT_DESCRIPTION: &str =
    "SEO, paid advertising, social media and web design for businesses that want measurable growth.";
pub const DEFAULT_IMAGE: &str = "/images/og-default.jpg";

/// The meta values written into a page.
#[derive(Debug, Clone, PartialEq)]
pub struct SeoMeta {
    pub title: String,
    pub description: String,
    pub image: String,
    /// Absolute page URL when a site URL is known, else the bare path.
    pub url: String,
    pub keywords: Option<String>,
}

/// What a request path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRoute {
    Home,
    Listing(Collection),
    Detail(Collection, String),
    Other,
}

/// A request path reduced to what resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Path without query, fragment or trailing slash; `/` for the home page.
    pub path: String,
    pub route: PageRoute,
}

fn page_collection(segment: &str) -> Option<Collection> {
    match segment {
        "services" => Some(Collection::Services),
        "packages" | "pricing" => Some(Collection::Packages),
        "cases" | "case-studies" | "portfolio" => Some(Collection::Cases),
        "blog" => Some(Collection::Blog),
        _ => None,
    }
}

/// Trims the query, a trailing `index.html` and the trailing slash, keeping
/// `/` for the root.
pub fn normalize_path(raw: &str) -> String {
    let path = raw.split(['?', '#']).next().unwrap_or("");
    let path = path.strip_suffix("/index.html").unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Percent-decodes a path segment; invalid UTF-8 keeps the raw segment.
fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8()
        .map_or_else(|_| segment.to_string(), |decoded| decoded.into_owned())
}

impl PageRequest {
    pub fn parse(raw: &str) -> Self {
        let path = normalize_path(raw);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => PageRoute::Home,
            [section] => page_collection(section).map_or(PageRoute::Other, PageRoute::Listing),
            [section, key] => match page_collection(section) {
                Some(collection) => PageRoute::Detail(collection, decode_segment(key)),
                None => PageRoute::Other,
            },
            _ => PageRoute::Other,
        };
        Self { path, route }
    }
}

/// Title, description and image contributed by an entity page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectMeta {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Content that can stand behind a detail page.
pub trait PageSubject {
    fn id(&self) -> &str;
    fn slug(&self) -> Option<&str>;
    fn subject_meta(&self) -> SubjectMeta;

    fn answers_to(&self, key: &str) -> bool {
        self.id() == key || self.slug() == Some(key)
    }
}

fn first_text(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

impl PageSubject for Service {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
    fn subject_meta(&self) -> SubjectMeta {
        SubjectMeta {
            title: self.title.clone(),
            description: first_text(&[&self.short_description, &self.description]),
            image: self.image.clone(),
        }
    }
}

impl PageSubject for CaseStudy {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
    fn subject_meta(&self) -> SubjectMeta {
        SubjectMeta {
            title: self.title.clone(),
            description: first_text(&[&self.excerpt, &self.content]),
            image: self.image.clone(),
        }
    }
}

impl PageSubject for BlogPost {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
    fn subject_meta(&self) -> SubjectMeta {
        SubjectMeta {
            title: self.title.clone(),
            description: first_text(&[&self.excerpt, &self.content]),
            image: self.image.clone(),
        }
    }
}

impl PageSubject for Package {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> Option<&str> {
        None
    }
    fn subject_meta(&self) -> SubjectMeta {
        SubjectMeta {
            title: self.name.clone(),
            description: first_text(&[&self.description]),
            image: None,
        }
    }
}

fn find_typed<T>(records: &[Value], key: &str) -> Option<SubjectMeta>
where
    T: PageSubject + serde::de::DeserializeOwned,
{
    records
        .iter()
        .filter_map(|r| serde_json::from_value::<T>(r.clone()).ok())
        .find(|subject| subject.answers_to(key))
        .map(|subject| subject.subject_meta())
}

/// Finds the entity a detail route points at among the collection's records.
pub fn find_subject(collection: Collection, records: &[Value], key: &str) -> Option<SubjectMeta> {
    match collection {
        Collection::Services => find_typed::<Service>(records, key),
        Collection::Cases => find_typed::<CaseStudy>(records, key),
        Collection::Blog => find_typed::<BlogPost>(records, key),
        Collection::Packages => find_typed::<Package>(records, key),
        _ => None,
    }
}

/// Everything resolution may draw on, already loaded.
#[derive(Debug, Clone, Default)]
pub struct SeoContext {
    pub overrides: Vec<SeoEntry>,
    pub subject: Option<SubjectMeta>,
    pub settings: Option<SiteSettings>,
    /// Site URL from server configuration, used when settings have none.
    pub site_url: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn find_override<'a>(overrides: &'a [SeoEntry], path: &str) -> Option<&'a SeoEntry> {
    overrides.iter().find(|entry| {
        let by_path = entry.path.as_deref().map(normalize_path);
        by_path.as_deref() == Some(path) || (entry.path.is_none() && normalize_path(&entry.id) == path)
    })
}

/// Prefixes root-relative paths with the site URL.
fn absolutize(site_url: Option<&str>, link: &str) -> String {
    match site_url {
        Some(base) if link.starts_with('/') && !link.starts_with("//") => {
            format!("{}{}", base.trim_end_matches('/'), link)
        }
        _ => link.to_string(),
    }
}

/// Picks the meta values for a page.
pub fn resolve(request: &PageRequest, context: &SeoContext) -> SeoMeta {
    let entry = find_override(&context.overrides, &request.path);
    let settings = context.settings.as_ref();
    let subject = context.subject.as_ref();

    let site_name = settings
        .and_then(|s| non_blank(&s.site_name))
        .unwrap_or(DEFAULT_SITE_NAME);
    let site_url = settings
        .and_then(|s| non_blank(&s.site_url))
        .or_else(|| non_blank(&context.site_url));

    let title = entry
        .and_then(|e| non_blank(&e.title))
        .map(str::to_string)
        .or_else(|| {
            subject
                .map(|s| s.title.trim())
                .filter(|t| !t.is_empty())
                .map(|t| format!("{} | {}", t, site_name))
        })
        .or_else(|| settings.and_then(|s| non_blank(&s.default_title)).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let description = entry
        .and_then(|e| non_blank(&e.description))
        .or_else(|| subject.and_then(|s| non_blank(&s.description)))
        .or_else(|| settings.and_then(|s| non_blank(&s.default_description)))
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    let image = entry
        .and_then(|e| non_blank(&e.image))
        .or_else(|| subject.and_then(|s| non_blank(&s.image)))
        .or_else(|| settings.and_then(|s| non_blank(&s.default_image)))
        .unwrap_or(DEFAULT_IMAGE);

    let keywords = entry
        .and_then(|e| non_blank(&e.keywords))
        .or_else(|| settings.and_then(|s| non_blank(&s.default_keywords)))
        .map(str::to_string);

    SeoMeta {
        title,
        description,
        image: absolutize(site_url, image),
        url: absolutize(site_url, &request.path),
        keywords,
    }
}
