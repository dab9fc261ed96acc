//! Bundled fallback data.
//!
//! The JSON files under `lib_site/defaults/` are compiled into the binary and
//! parsed once on first use. They are what the client shows when the API is
//! slow, failing or still empty, and what `seed` writes into a fresh database.

use super::{Collection, SiteSettings, SETTINGS_ID};
use serde_json::{json, Value};
use static_init::dynamic;
use std::collections::HashMap;

const SERVICES: &str = include_str!("../../defaults/services.json");
const PACKAGES: &str = include_str!("../../defaults/packages.json");
const CASES: &str = include_str!("../../defaults/cases.json");
const BLOG: &str = include_str!("../../defaults/blog.json");
const TEAM: &str = include_str!("../../defaults/team.json");
const TESTIMONIALS: &str = include_str!("../../defaults/testimonials.json");
const SETTINGS: &str = include_str!("../../defaults/settings.json");

#[dynamic]
/// Parsed bundles keyed by collection. Collections without a bundle are absent.
static BUNDLED: HashMap<Collection, Vec<Value>> = parse_bundles();

fn parse_list(raw: &str) -> Vec<Value> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn parse_bundles() -> HashMap<Collection, Vec<Value>> {
    let mut bundles = HashMap::new();
    bundles.insert(Collection::Services, parse_list(SERVICES));
    bundles.insert(Collection::Packages, parse_list(PACKAGES));
    bundles.insert(Collection::Cases, parse_list(CASES));
    bundles.insert(Collection::Blog, parse_list(BLOG));
    bundles.insert(Collection::Team, parse_list(TEAM));
    bundles.insert(Collection::Testimonials, parse_list(TESTIMONIALS));

    let settings: Value = serde_json::from_str(SETTINGS).unwrap_or_else(|_| json!({}));
    bundles.insert(Collection::Settings, vec![settings]);
    bundles
}

/// The bundled records for a collection; empty when nothing ships for it.
pub fn default_records(collection: Collection) -> Vec<Value> {
    BUNDLED.get(&collection).cloned().unwrap_or_default()
}

/// The bundled site settings as a typed view.
pub fn default_settings() -> SiteSettings {
    default_records(Collection::Settings)
        .into_iter()
        .next()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_else(|| SiteSettings {
            id: SETTINGS_ID.to_string(),
            ..SiteSettings::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlogPost, CaseStudy, Service};

    #[test]
    fn every_bundle_parses_into_its_typed_view() {
        let services: Vec<Service> =
            serde_json::from_value(Value::Array(default_records(Collection::Services))).unwrap();
        assert!(services.iter().all(|s| !s.id.is_empty() && !s.title.is_empty()));

        let cases: Vec<CaseStudy> =
            serde_json::from_value(Value::Array(default_records(Collection::Cases))).unwrap();
        assert!(!cases.is_empty());

        let posts: Vec<BlogPost> =
            serde_json::from_value(Value::Array(default_records(Collection::Blog))).unwrap();
        assert!(posts.iter().all(|p| p.slug.is_some()));

        for collection in [Collection::Packages, Collection::Team, Collection::Testimonials] {
            assert!(!default_records(collection).is_empty(), "{collection} bundle is empty");
        }
    }

    #[test]
    fn private_and_admin_collections_ship_empty() {
        for collection in [Collection::Leads, Collection::Seo, Collection::Popups, Collection::Media] {
            assert!(default_records(collection).is_empty());
        }
    }

    #[test]
    fn settings_bundle_has_the_fixed_id() {
        let settings = default_settings();
        assert_eq!(settings.id, SETTINGS_ID);
        assert_eq!(settings.site_name.as_deref(), Some("Brightpath Marketing"));
    }
}
