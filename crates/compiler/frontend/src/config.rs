use bon::bon;
use serde::Deserialize;

use crate::constants::{annotation, ident};
use crate::FqName;

/// Plugin options, fixed for the whole compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Configuration {
    enabled: bool,
    accessor_name: String,
    trackable_annotation: FqName,
    track_with: String,
}

#[bon]
impl Configuration {
    #[builder]
    pub fn new(
        #[builder(default = true)] enabled: bool,
        #[builder(into, default = ident::TRACK.to_owned())] accessor_name: String,
        #[builder(into, default = FqName::from(annotation::TRACKABLE))]
        trackable_annotation: FqName,
        #[builder(into, default = annotation::TRACK_WITH.to_owned())] track_with: String,
    ) -> Self {
        Self {
            enabled,
            accessor_name,
            trackable_annotation,
            track_with,
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn accessor_name(&self) -> &str {
        &self.accessor_name
    }

    #[inline]
    pub fn trackable_annotation(&self) -> &FqName {
        &self.trackable_annotation
    }

    #[inline]
    pub fn track_with(&self) -> &str {
        &self.track_with
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_plugin_options() {
        let config = Configuration::default();

        assert!(config.enabled());
        assert_eq!(config.accessor_name(), "track");
        assert_eq!(
            config.trackable_annotation().as_str(),
            "com.github.hadilq.trackable.annotations.Trackable"
        );
        assert_eq!(config.track_with(), "trackWith");
    }

    #[test]
    fn builder_overrides_single_options() {
        let config = Configuration::builder()
            .accessor_name("eventName")
            .trackable_annotation("com.example.Event")
            .build();

        assert_eq!(config.accessor_name(), "eventName");
        assert_eq!(config.trackable_annotation().simple_name(), "Event");
        assert_eq!(config.track_with(), "trackWith");
    }
}
