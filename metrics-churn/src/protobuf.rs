//! Protobuf serialization support for generated populations.

use prost::Message;

use crate::family::{Family, MetricType};
use crate::population::Population;

/// Content type of the length-delimited Prometheus protobuf exposition format.
pub const PROTOBUF_CONTENT_TYPE: &str =
    "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=delimited";

/// Message types of the `io.prometheus.client` package.
///
/// Only the fields needed to describe gauges are declared; tags match `metrics.proto`.
pub mod pb {
    #![allow(missing_docs)]

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct LabelPair {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub value: Option<String>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Gauge {
        #[prost(double, optional, tag = "1")]
        pub value: Option<f64>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Metric {
        #[prost(message, repeated, tag = "1")]
        pub label: Vec<LabelPair>,
        #[prost(message, optional, tag = "2")]
        pub gauge: Option<Gauge>,
        #[prost(int64, optional, tag = "6")]
        pub timestamp_ms: Option<i64>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct MetricFamily {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub help: Option<String>,
        #[prost(enumeration = "MetricType", optional, tag = "3")]
        pub r#type: Option<i32>,
        #[prost(message, repeated, tag = "4")]
        pub metric: Vec<Metric>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum MetricType {
        Counter = 0,
        Gauge = 1,
        Summary = 2,
        Untyped = 3,
        Histogram = 4,
        GaugeHistogram = 5,
    }
}

/// Renders a population into protobuf format using length-delimited encoding.
///
/// Each family becomes one `MetricFamily` message prefixed with a varint length header.
pub fn render_protobuf(population: &Population) -> Vec<u8> {
    let mut output = Vec::new();

    for family in population.families() {
        family_to_protobuf(family).encode_length_delimited(&mut output).unwrap();
    }

    output
}

fn family_to_protobuf(family: &Family) -> pb::MetricFamily {
    let metric = family
        .series()
        .iter()
        .map(|series| pb::Metric {
            label: series
                .labels()
                .iter()
                .map(|label| pb::LabelPair {
                    name: Some(label.key().to_owned()),
                    value: Some(label.value().to_owned()),
                })
                .collect(),
            gauge: Some(pb::Gauge { value: Some(series.value()) }),
            timestamp_ms: None,
        })
        .collect();

    pb::MetricFamily {
        name: Some(family.name().to_owned()),
        help: None,
        r#type: Some(metric_type_to_protobuf(family.metric_type()) as i32),
        metric,
    }
}

fn metric_type_to_protobuf(metric_type: MetricType) -> pb::MetricType {
    match metric_type {
        MetricType::Gauge => pb::MetricType::Gauge,
    }
}
