//! Deterministic post-processing every cronjob gets after a template builds
//! it: identity tagging, resource-attribute propagation, and OTLP exporter
//! wiring. Ported from `templates.py`'s `_tag_cronjob` and its three helpers.

use base64::Engine;
use health_check_core::{CheckId, InCheckMetadata, UserInfo};
use k8s_openapi::api::core::v1::{EnvVar, VolumeMount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::builder::tls_volume;

/// `env OTEL_EXPORTER_OTLP_ENDPOINT` — when set, checks export their spans to
/// this collector.
pub const OTEL_EXPORTER_OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
/// `env CHECK_MANAGER_COLLECTOR_TLS_SECRET` — when set, the collector
/// requires mTLS and this names the `Secret` holding the client cert/key.
pub const COLLECTOR_TLS_SECRET_ENV: &str = "CHECK_MANAGER_COLLECTOR_TLS_SECRET";

/// Stamps identity metadata (annotations + a fresh UUIDv4 name) onto the
/// cronjob. Mirrors `_add_metadata`.
fn add_metadata(cronjob: &mut k8s_openapi::api::batch::v1::CronJob, metadata: &InCheckMetadata) {
    let meta = cronjob.metadata.clone();
    cronjob.metadata = ObjectMeta {
        annotations: Some({
            let mut annotations = meta.annotations.unwrap_or_default();
            annotations.insert("name".to_string(), metadata.name.clone());
            annotations.insert("description".to_string(), metadata.description.clone());
            annotations.insert("template_id".to_string(), metadata.template_id.as_str().to_string());
            annotations.insert(
                "template_args".to_string(),
                serde_json::to_string(&metadata.template_args).unwrap_or_default(),
            );
            annotations
        }),
        name: Some(uuid::Uuid::new_v4().to_string()),
        ..meta
    };
}

fn first_container_env(
    cronjob: &mut k8s_openapi::api::batch::v1::CronJob,
) -> &mut Option<Vec<EnvVar>> {
    &mut cronjob
        .spec
        .as_mut()
        .expect("cronjob has a spec")
        .job_template
        .spec
        .as_mut()
        .expect("cronjob has a job template spec")
        .template
        .spec
        .as_mut()
        .expect("cronjob has a pod spec")
        .containers[0]
        .env
}

/// Appends `OTEL_RESOURCE_ATTRIBUTES` built from the now-named cronjob, the
/// authenticated user, and the check's display name. Mirrors
/// `_add_otel_resource_attributes`.
fn add_otel_resource_attributes(
    cronjob: &mut k8s_openapi::api::batch::v1::CronJob,
    userinfo: &UserInfo,
) {
    let check_id = cronjob.metadata.name.clone().unwrap_or_default();
    let username = userinfo.username_or("Unkown user");
    let name = cronjob
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get("name"))
        .cloned()
        .unwrap_or_default();

    let value = format!("k8s.cronjob.name={check_id},user.id={username},health_check.name={name}");
    let env = first_container_env(cronjob).get_or_insert_with(Vec::new);
    env.push(EnvVar {
        name: "OTEL_RESOURCE_ATTRIBUTES".to_string(),
        value: Some(value),
        ..Default::default()
    });
}

/// Wires the OTLP exporter endpoint and, if mTLS is configured, the
/// certificate env vars plus the `tls` volume/mount. Mirrors
/// `_add_otel_exporter_variables`.
fn add_otel_exporter_variables(cronjob: &mut k8s_openapi::api::batch::v1::CronJob) {
    let otlp_endpoint = std::env::var(OTEL_EXPORTER_OTLP_ENDPOINT_ENV).ok();
    let tls_secret = std::env::var(COLLECTOR_TLS_SECRET_ENV).ok();

    let env = first_container_env(cronjob).get_or_insert_with(Vec::new);
    if let Some(endpoint) = &otlp_endpoint {
        env.push(EnvVar {
            name: OTEL_EXPORTER_OTLP_ENDPOINT_ENV.to_string(),
            value: Some(endpoint.clone()),
            ..Default::default()
        });
    }
    if tls_secret.is_some() {
        env.push(EnvVar {
            name: "OTEL_EXPORTER_OTLP_CERTIFICATE".to_string(),
            value: Some("/tls/ca.crt".to_string()),
            ..Default::default()
        });
        env.push(EnvVar {
            name: "OTEL_EXPORTER_OTLP_CLIENT_KEY".to_string(),
            value: Some("/tls/tls.key".to_string()),
            ..Default::default()
        });
        env.push(EnvVar {
            name: "OTEL_EXPORTER_OTLP_CLIENT_CERTIFICATE".to_string(),
            value: Some("/tls/tls.crt".to_string()),
            ..Default::default()
        });
    }

    if let Some(secret_name) = tls_secret {
        let pod_spec = cronjob
            .spec
            .as_mut()
            .expect("cronjob has a spec")
            .job_template
            .spec
            .as_mut()
            .expect("cronjob has a job template spec")
            .template
            .spec
            .as_mut()
            .expect("cronjob has a pod spec");

        pod_spec.containers[0]
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .push(VolumeMount {
                name: "tls".to_string(),
                mount_path: "/tls".to_string(),
                read_only: Some(true),
                ..Default::default()
            });
        pod_spec
            .volumes
            .get_or_insert_with(Vec::new)
            .push(tls_volume("tls", &secret_name));
    }
}

/// The three deterministic post-steps every generated cronjob goes through,
/// regardless of which template produced it. Mirrors `_tag_cronjob`.
pub fn tag_cronjob(
    mut cronjob: k8s_openapi::api::batch::v1::CronJob,
    metadata: &InCheckMetadata,
    userinfo: &UserInfo,
) -> k8s_openapi::api::batch::v1::CronJob {
    add_metadata(&mut cronjob, metadata);
    add_otel_resource_attributes(&mut cronjob, userinfo);
    add_otel_exporter_variables(&mut cronjob);
    cronjob
}

/// Reads the cronjob's generated name back out as a [`CheckId`].
pub fn check_id_of(cronjob: &k8s_openapi::api::batch::v1::CronJob) -> CheckId {
    CheckId::new(cronjob.metadata.name.clone().unwrap_or_default())
}

/// Base64-encodes `src` as a `data:` URL the runner image downloads and
/// executes directly, sparing templates a real object store. Mirrors
/// `src_to_data_url`.
pub fn src_to_data_url(src: &str) -> String {
    format!(
        "data:text/plain;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(src)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn src_to_data_url_matches_expected_format() {
        assert_eq!(src_to_data_url("foo"), "data:text/plain;base64,Zm9v");
    }
}
