use std::fmt;

use serde::{Deserialize, Serialize};

use crate::verb::Verb;

/// Closed set of metadata formats the provider knows how to disseminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetadataFormat {
    OaiDc,
    Ese,
    Mets,
    MarcXml,
    Epicur,
    Lido,
    Tei,
    Cmdi,
    OverviewPage,
    Crowdsourcing,
}

impl MetadataFormat {
    pub const ALL: [MetadataFormat; 10] = [
        MetadataFormat::OaiDc,
        MetadataFormat::Ese,
        MetadataFormat::Mets,
        MetadataFormat::MarcXml,
        MetadataFormat::Epicur,
        MetadataFormat::Lido,
        MetadataFormat::Tei,
        MetadataFormat::Cmdi,
        MetadataFormat::OverviewPage,
        MetadataFormat::Crowdsourcing,
    ];

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.prefix() == prefix)
    }

    pub fn prefix(self) -> &'static str {
        match self {
            MetadataFormat::OaiDc => "oai_dc",
            MetadataFormat::Ese => "ese",
            MetadataFormat::Mets => "mets",
            MetadataFormat::MarcXml => "marcxml",
            MetadataFormat::Epicur => "epicur",
            MetadataFormat::Lido => "lido",
            MetadataFormat::Tei => "tei",
            MetadataFormat::Cmdi => "cmdi",
            MetadataFormat::OverviewPage => "iv_overviewpage",
            MetadataFormat::Crowdsourcing => "iv_crowdsourcing",
        }
    }

    fn namespace_and_schema(self) -> (&'static str, &'static str) {
        match self {
            MetadataFormat::OaiDc => (
                "http://www.openarchives.org/OAI/2.0/oai_dc/",
                "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
            ),
            MetadataFormat::Ese => (
                "http://www.europeana.eu/schemas/ese/",
                "http://www.europeana.eu/schemas/ese/ESE-V3.4.xsd",
            ),
            MetadataFormat::Mets => (
                "http://www.loc.gov/METS/",
                "http://www.loc.gov/standards/mets/mets.xsd",
            ),
            MetadataFormat::MarcXml => (
                "http://www.loc.gov/MARC21/slim",
                "http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd",
            ),
            MetadataFormat::Epicur => (
                "urn:nbn:de:1111-2004033116",
                "http://www.persistent-identifier.de/xepicur/version1.0/xepicur.xsd",
            ),
            MetadataFormat::Lido => (
                "http://www.lido-schema.org",
                "http://www.lido-schema.org/schema/v1.0/lido-v1.0.xsd",
            ),
            MetadataFormat::Tei => (
                "http://www.tei-c.org/ns/1.0",
                "http://www.tei-c.org/release/xml/tei/custom/schema/xsd/tei_all.xsd",
            ),
            MetadataFormat::Cmdi => (
                "http://www.clarin.eu/cmd/1",
                "https://infra.clarin.eu/CMDI/1.x/xsd/cmd-envelop.xsd",
            ),
            MetadataFormat::OverviewPage => (
                "http://www.intranda.com/digiverso/intrandaviewer/overviewpage",
                "http://www.intranda.com/digiverso/intrandaviewer/overviewpage.xsd",
            ),
            MetadataFormat::Crowdsourcing => (
                "http://www.intranda.com/digiverso/intrandaviewer/crowdsourcing",
                "http://www.intranda.com/digiverso/intrandaviewer/crowdsourcing.xsd",
            ),
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Per-format configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format: MetadataFormat,
    pub namespace_uri: String,
    pub schema_location: String,
    #[serde(default = "default_true")]
    pub usable_for_harvesting: bool,
    #[serde(default = "default_true")]
    pub usable_for_query: bool,
    /// Field whose distinct values expand one record into several items.
    #[serde(default)]
    pub version_discriminator_field: Option<String>,
    /// Timestamp-irrelevant formats never receive a date-range clause.
    #[serde(default)]
    pub ignore_dates: bool,
    /// Extra clause ANDed into every query for this format.
    #[serde(default)]
    pub additional_query: Option<String>,
    /// Virtual items per page; falls back to the provider default.
    #[serde(default)]
    pub hits_per_page: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl FormatDescriptor {
    /// Descriptor with the well-known namespace and schema for `format`.
    pub fn standard(format: MetadataFormat) -> Self {
        let (namespace_uri, schema_location) = format.namespace_and_schema();
        let mut descriptor = Self {
            format,
            namespace_uri: namespace_uri.to_string(),
            schema_location: schema_location.to_string(),
            usable_for_harvesting: true,
            usable_for_query: true,
            version_discriminator_field: None,
            ignore_dates: false,
            additional_query: None,
            hits_per_page: None,
        };
        match format {
            MetadataFormat::Mets => {
                descriptor.additional_query = Some("SOURCEDOCFORMAT:METS".to_string());
            }
            MetadataFormat::Lido => {
                descriptor.additional_query = Some("SOURCEDOCFORMAT:LIDO".to_string());
            }
            MetadataFormat::Tei | MetadataFormat::Cmdi => {
                descriptor.version_discriminator_field = Some("LANGUAGE".to_string());
            }
            MetadataFormat::OverviewPage | MetadataFormat::Crowdsourcing => {
                descriptor.ignore_dates = true;
            }
            _ => {}
        }
        descriptor
    }

    pub fn prefix(&self) -> &'static str {
        self.format.prefix()
    }

    pub fn expands_records(&self) -> bool {
        self.version_discriminator_field.is_some()
    }
}

/// The formats enabled for this provider. A format absent from the catalog
/// is treated as unsupported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatCatalog {
    formats: Vec<FormatDescriptor>,
}

impl FormatCatalog {
    pub fn new(formats: Vec<FormatDescriptor>) -> Self {
        Self { formats }
    }

    pub fn get(&self, format: MetadataFormat) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|d| d.format == format)
    }

    /// Descriptor for `format` if it may be used by harvesting verbs.
    pub fn harvestable(&self, format: MetadataFormat) -> Option<&FormatDescriptor> {
        self.get(format).filter(|d| d.usable_for_harvesting)
    }

    /// Descriptor for `format` if `GetRecord` may disseminate it.
    pub fn queryable(&self, format: MetadataFormat) -> Option<&FormatDescriptor> {
        self.get(format).filter(|d| d.usable_for_query)
    }

    /// Descriptor `verb` may use: the list verbs need a harvestable format,
    /// `GetRecord` a queryable one.
    pub fn enabled_for(&self, format: MetadataFormat, verb: Verb) -> Option<&FormatDescriptor> {
        match verb {
            Verb::GetRecord => self.queryable(format),
            _ => self.harvestable(format),
        }
    }

    pub fn iter_harvestable(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.formats.iter().filter(|d| d.usable_for_harvesting)
    }
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::new(
            MetadataFormat::ALL
                .into_iter()
                .map(FormatDescriptor::standard)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_resolve_to_formats() {
        assert_eq!(MetadataFormat::from_prefix("oai_dc"), Some(MetadataFormat::OaiDc));
        assert_eq!(
            MetadataFormat::from_prefix("iv_overviewpage"),
            Some(MetadataFormat::OverviewPage)
        );
        assert_eq!(MetadataFormat::from_prefix("OAI_DC"), None);
        assert_eq!(MetadataFormat::from_prefix("dc"), None);
    }

    #[test]
    fn disabled_format_is_not_harvestable() {
        let mut mets = FormatDescriptor::standard(MetadataFormat::Mets);
        mets.usable_for_harvesting = false;
        let catalog = FormatCatalog::new(vec![
            FormatDescriptor::standard(MetadataFormat::OaiDc),
            mets,
        ]);
        assert!(catalog.harvestable(MetadataFormat::OaiDc).is_some());
        assert!(catalog.get(MetadataFormat::Mets).is_some());
        assert!(catalog.harvestable(MetadataFormat::Mets).is_none());
        assert!(catalog.harvestable(MetadataFormat::Lido).is_none());
        assert_eq!(catalog.iter_harvestable().count(), 1);
    }

    #[test]
    fn get_record_follows_the_query_flag() {
        let mut tei = FormatDescriptor::standard(MetadataFormat::Tei);
        tei.usable_for_query = false;
        let mut lido = FormatDescriptor::standard(MetadataFormat::Lido);
        lido.usable_for_harvesting = false;
        let catalog = FormatCatalog::new(vec![tei, lido]);

        assert!(catalog.enabled_for(MetadataFormat::Tei, Verb::ListRecords).is_some());
        assert!(catalog.enabled_for(MetadataFormat::Tei, Verb::GetRecord).is_none());
        assert!(catalog.enabled_for(MetadataFormat::Lido, Verb::ListIdentifiers).is_none());
        assert!(catalog.enabled_for(MetadataFormat::Lido, Verb::GetRecord).is_some());
        assert!(catalog.queryable(MetadataFormat::OaiDc).is_none());
    }

    #[test]
    fn expanding_formats_carry_a_discriminator() {
        assert!(FormatDescriptor::standard(MetadataFormat::Tei).expands_records());
        assert!(!FormatDescriptor::standard(MetadataFormat::OaiDc).expands_records());
        assert!(FormatDescriptor::standard(MetadataFormat::Crowdsourcing).ignore_dates);
    }
}
