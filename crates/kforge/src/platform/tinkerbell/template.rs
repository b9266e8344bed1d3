//! `cluster.tf` rendering for Tinkerbell clusters.

use super::{TinkerbellConfig, TinkerbellWorkerPool};
use crate::render::hcl::{Block, Body};

const CONTROLLERS_SOURCE: &str = "../terraform-modules/tinkerbell";
const WORKER_POOL_SOURCE: &str = "../terraform-modules/tinkerbell/workerpool";

/// Provider version constraints, in rendering order.
const PROVIDERS: &[(&str, &str)] = &[
    ("ct", "~> 0.3"),
    ("local", "1.4.0"),
    ("null", "~> 2.1"),
    ("template", "~> 2.1"),
    ("tls", "~> 2.0"),
    ("tinkerbell", "~> 0.0.0"),
];

/// Chart values exposed by the controllers module, and whether they carry
/// secrets.
const CHART_VALUES_OUTPUTS: &[(&str, bool)] = &[
    ("pod-checkpointer_values", false),
    ("kube-apiserver_values", true),
    ("kubernetes_values", true),
    ("kubelet_values", true),
    ("calico_values", false),
];

pub(super) fn render(config: &TinkerbellConfig) -> String {
    let mut doc = Body::new();

    doc.block(controllers(config));
    for pool in &config.worker_pools {
        doc.block(worker_pool(config, pool));
    }

    for (name, version) in PROVIDERS {
        let mut provider = Block::new("provider").label(*name);
        provider.body().attr("version", *version);
        doc.block(provider);
    }

    doc.blank()
        .comment("Set once terraform has run at least once.");
    let mut initialized = Block::new("output").label("initialized");
    initialized.body().attr("value", true);
    doc.block(initialized);

    for (name, sensitive) in CHART_VALUES_OUTPUTS {
        doc.block(module_output(name, *sensitive));
    }
    doc.block(module_output("kubeconfig", true));

    doc.render()
}

fn controllers(config: &TinkerbellConfig) -> Block {
    let mut module = Block::new("module").label("controllers");
    module
        .body()
        .attr("source", CONTROLLERS_SOURCE)
        .blank()
        .comment("Generic configuration.")
        .attr("asset_dir", "../cluster-assets")
        .attr("cluster_name", config.name.as_str())
        .list("ssh_keys", &config.ssh_public_keys)
        .blank()
        .list("ip_addresses", &config.controller_ip_addresses)
        .blank()
        .attr("dns_zone", config.dns_zone.as_str())
        .string_if_set(
            "flatcar_install_base_url",
            &config.controller_flatcar_install_base_url,
        )
        .blank()
        .heredocs_if_set("clc_snippets", &config.controller_clc_snippets)
        .blank()
        .string_if_set("os_channel", &config.os_channel)
        .string_if_set("os_version", &config.os_version)
        .attr("enable_aggregation", config.enable_aggregation)
        .number_if_set("network_mtu", i64::from(config.network_mtu))
        .string_if_set("pod_cidr", &config.pod_cidr)
        .string_if_set("service_cidr", &config.service_cidr)
        .string_if_set("cluster_domain_suffix", &config.cluster_domain_suffix)
        .attr("enable_reporting", config.enable_reporting)
        .number_if_set(
            "certs_validity_period_hours",
            i64::from(config.certs_validity_period_hours),
        );
    module
}

fn worker_pool(config: &TinkerbellConfig, pool: &TinkerbellWorkerPool) -> Block {
    let mut module = Block::new("module").label(format!("worker-{}", pool.name));
    module
        .body()
        .attr("source", WORKER_POOL_SOURCE)
        .blank()
        .expr("kubeconfig", "module.controllers.kubeconfig")
        .expr(
            "cluster_dns_service_ip",
            "module.controllers.cluster_dns_service_ip",
        )
        .blank()
        .attr("cluster_name", config.name.as_str())
        .list_if_set("ssh_keys", &pool.ssh_public_keys)
        .string_if_set("flatcar_install_base_url", &pool.flatcar_install_base_url)
        .list("ip_addresses", &pool.ip_addresses)
        .string_if_set("cluster_domain_suffix", &config.cluster_domain_suffix)
        .string_if_set("os_channel", &pool.os_channel)
        .string_if_set("os_version", &pool.os_version)
        .blank()
        .heredocs_if_set("clc_snippets", &pool.clc_snippets)
        .list_if_set("kubelet_labels", &pool.labels)
        .list_if_set("taints", &pool.taints);
    module
}

fn module_output(name: &str, sensitive: bool) -> Block {
    let mut output = Block::new("output").label(name);
    output
        .body()
        .expr("value", &format!("module.controllers.{name}"));
    if sensitive {
        output.body().attr("sensitive", true);
    }
    output
}
