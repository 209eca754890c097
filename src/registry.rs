//! Turns a [`RelayConfig`] into a ready-to-run [`Relay`].

use anyhow::{bail, Result};
use metrelay_sdk::{Output, Relay, RelayBuilder};
use tracing::info;

use crate::config::{DestinationsConfig, RelayConfig, SourcesConfig};

/// Build the relay described by `config`.
///
/// Fails when a configured section needs a cargo feature this binary was
/// built without, or when nothing would be polled or published.
pub async fn build_relay(config: &RelayConfig) -> Result<Relay> {
    if config.sources.is_empty() {
        bail!("no sources configured");
    }
    if config.destinations.is_empty() {
        bail!("no destinations configured");
    }

    let builder = Relay::builder()
        .tick(config.tick)
        .call_timeout(config.call_timeout);
    let builder = add_sources(builder, &config.sources, config.call_timeout).await?;
    let builder = add_destinations(builder, &config.destinations).await?;

    Ok(builder.build())
}

#[allow(unused_mut, unused_variables)]
async fn add_sources(
    mut builder: RelayBuilder,
    sources: &SourcesConfig,
    timeout: std::time::Duration,
) -> Result<RelayBuilder> {
    if let Some(zabbix) = &sources.zabbix {
        #[cfg(feature = "zabbix")]
        {
            use metrelay_adapters::zabbix::{ZabbixClient, ZabbixMetricsSource};

            let client = ZabbixClient::builder()
                .url(&zabbix.url)
                .credentials(&zabbix.username, &zabbix.password)
                .timeout(timeout)
                .build()?;
            builder = builder.source(
                ZabbixMetricsSource::new(client, zabbix.metrics.clone()).with_interval(zabbix.interval),
            );
        }
        #[cfg(not(feature = "zabbix"))]
        bail!(missing_feature("sources.zabbix", "zabbix"));
    }

    if let Some(availability) = &sources.zabbix_availability {
        #[cfg(feature = "zabbix")]
        {
            use metrelay_adapters::zabbix::{ZabbixAvailabilitySource, ZabbixClient};

            let client = ZabbixClient::builder()
                .url(&availability.url)
                .credentials(&availability.username, &availability.password)
                .timeout(timeout)
                .build()?;
            builder = builder.source(
                ZabbixAvailabilitySource::new(client, availability.triggers.clone())
                    .with_interval(availability.interval),
            );
        }
        #[cfg(not(feature = "zabbix"))]
        bail!(missing_feature("sources.zabbix_availability", "zabbix"));
    }

    if let Some(es) = &sources.elasticsearch {
        #[cfg(feature = "elasticsearch")]
        {
            use metrelay_adapters::elasticsearch::ElasticsearchSource;

            builder = builder.source(ElasticsearchSource::new(&es.url)?.with_interval(es.interval));
        }
        #[cfg(not(feature = "elasticsearch"))]
        bail!(missing_feature("sources.elasticsearch", "elasticsearch"));
    }

    if let Some(carbon) = &sources.carbon_intensity {
        #[cfg(feature = "carbon-intensity")]
        {
            use metrelay_adapters::carbon::CarbonIntensitySource;

            builder = builder.source(
                CarbonIntensitySource::new()?
                    .with_endpoint(&carbon.endpoint)
                    .with_region(carbon.region)
                    .with_interval(carbon.interval),
            );
        }
        #[cfg(not(feature = "carbon-intensity"))]
        bail!(missing_feature("sources.carbon_intensity", "carbon-intensity"));
    }

    if let Some(cw) = &sources.cloudwatch {
        #[cfg(feature = "cloudwatch")]
        {
            use metrelay_adapters::cloudwatch::{self, DatabaseSource, LoadBalancerSource};

            let client = cloudwatch::connect(&cw.access_key, &cw.access_secret, &cw.region).await;
            if !cw.load_balancers.is_empty() {
                builder = builder.source(
                    LoadBalancerSource::new(client.clone(), cw.load_balancers.clone())
                        .with_interval(cw.load_balancer_interval),
                );
            }
            if !cw.databases.is_empty() {
                builder = builder.source(
                    DatabaseSource::new(client, cw.databases.clone()).with_interval(cw.database_interval),
                );
            }
        }
        #[cfg(not(feature = "cloudwatch"))]
        bail!(missing_feature("sources.cloudwatch", "cloudwatch"));
    }

    Ok(builder)
}

#[allow(unused_mut)]
async fn add_destinations(mut builder: RelayBuilder, destinations: &DestinationsConfig) -> Result<RelayBuilder> {
    if let Some(mqtt) = &destinations.mqtt {
        #[cfg(feature = "mqtt")]
        {
            use metrelay_sdk::{MqttConfig, MqttOutput};

            let mut options = MqttConfig::new(&mqtt.host, &mqtt.topic).port(mqtt.port);
            if let Some(client_id) = &mqtt.client_id {
                options = options.client_id(client_id);
            }
            if let Some(ca_cert) = &mqtt.ca_cert {
                options = options.ca_cert(ca_cert);
            }
            info!(host = %mqtt.host, port = mqtt.port, topic = %mqtt.topic, "Publishing to MQTT");
            builder = builder.destination(Output::Mqtt(MqttOutput::connect(options)?));
        }
        #[cfg(not(feature = "mqtt"))]
        bail!(missing_feature("destinations.mqtt", "mqtt"));
    }

    if let Some(nats) = &destinations.nats {
        #[cfg(feature = "nats")]
        {
            use metrelay_sdk::NatsOutput;

            info!(url = %nats.url, subject = %nats.subject, "Publishing to NATS");
            builder = builder.destination(Output::Nats(NatsOutput::connect(&nats.url, &nats.subject).await?));
        }
        #[cfg(not(feature = "nats"))]
        bail!(missing_feature("destinations.nats", "nats"));
    }

    if let Some(file) = &destinations.file {
        info!(path = %file.path.display(), "Writing snapshots to file");
        builder = builder.destination(Output::file(&file.path));
    }

    if let Some(tcp) = &destinations.tcp {
        info!(addr = %tcp.addr, "Sending snapshots over TCP");
        builder = builder.destination(Output::tcp(&tcp.addr));
    }

    Ok(builder)
}

#[allow(dead_code)]
fn missing_feature(section: &str, feature: &str) -> String {
    format!("[{section}] is configured but metrelay was built without the `{feature}` feature")
}
