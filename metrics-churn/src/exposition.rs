use crate::formatting::{render_text, TEXT_CONTENT_TYPE};
use crate::population::Population;

/// Media type requested by scrapers that want the protobuf format.
#[cfg(feature = "protobuf")]
const PROTOBUF_MEDIA_TYPE: &str = "application/vnd.google.protobuf";

/// A wire format for scrape responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpositionFormat {
    /// The Prometheus text format, version 0.0.4.
    Text,

    /// Length-delimited `io.prometheus.client.MetricFamily` messages.
    #[cfg(feature = "protobuf")]
    #[cfg_attr(docsrs, doc(cfg(feature = "protobuf")))]
    Protobuf,
}

impl ExpositionFormat {
    /// Picks a format based on the `Accept` header of a scrape request.
    ///
    /// Protobuf is only used when the scraper explicitly asks for it, and text otherwise.
    pub fn negotiate(accept: Option<&str>) -> Self {
        match accept {
            #[cfg(feature = "protobuf")]
            Some(accept) if accept.contains(PROTOBUF_MEDIA_TYPE) => ExpositionFormat::Protobuf,
            _ => ExpositionFormat::Text,
        }
    }

    /// Gets the `Content-Type` of payloads in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExpositionFormat::Text => TEXT_CONTENT_TYPE,
            #[cfg(feature = "protobuf")]
            ExpositionFormat::Protobuf => crate::protobuf::PROTOBUF_CONTENT_TYPE,
        }
    }

    /// Renders the population in this format.
    pub fn render(&self, population: &Population) -> Vec<u8> {
        match self {
            ExpositionFormat::Text => render_text(population).into_bytes(),
            #[cfg(feature = "protobuf")]
            ExpositionFormat::Protobuf => crate::protobuf::render_protobuf(population),
        }
    }
}
