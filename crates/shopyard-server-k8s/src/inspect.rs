// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure summaries over listed cluster objects.
//!
//! Everything here works on already-fetched objects so it can be tested
//! without a cluster.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::types::{
	Deployment, Event, EventSummary, EventType, Ingress, PersistentVolumeClaim, Pod, ReplicaCounts,
	ResourceKind, ResourceSummary, ResourceUsage, Service, StatefulSet,
};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Coarse age of an object: seconds under a minute, then minutes, hours, days.
pub fn format_age(now: DateTime<Utc>, created: DateTime<Utc>) -> String {
	let secs = now.signed_duration_since(created).num_seconds().max(0);
	if secs < 60 {
		format!("{secs}s")
	} else if secs < 3600 {
		format!("{}m", secs / 60)
	} else if secs < 86_400 {
		format!("{}h", secs / 3600)
	} else {
		format!("{}d", secs / 86_400)
	}
}

fn age_of(now: DateTime<Utc>, metadata: &ObjectMeta) -> String {
	metadata
		.creation_timestamp
		.as_ref()
		.map(|ts| format_age(now, ts.0))
		.unwrap_or_default()
}

pub fn deployment_replicas(deployment: &Deployment) -> ReplicaCounts {
	ReplicaCounts {
		ready: deployment
			.status
			.as_ref()
			.and_then(|s| s.ready_replicas)
			.unwrap_or(0),
		desired: deployment
			.spec
			.as_ref()
			.and_then(|s| s.replicas)
			.unwrap_or(0),
	}
}

pub fn stateful_set_replicas(stateful_set: &StatefulSet) -> ReplicaCounts {
	ReplicaCounts {
		ready: stateful_set
			.status
			.as_ref()
			.and_then(|s| s.ready_replicas)
			.unwrap_or(0),
		desired: stateful_set
			.spec
			.as_ref()
			.and_then(|s| s.replicas)
			.unwrap_or(0),
	}
}

/// Host of the first ingress rule, if any.
pub fn ingress_first_host(ingress: &Ingress) -> Option<String> {
	ingress
		.spec
		.as_ref()
		.and_then(|spec| spec.rules.as_ref())
		.and_then(|rules| rules.first())
		.and_then(|rule| rule.host.clone())
		.filter(|host| !host.is_empty())
}

fn controller_row(
	now: DateTime<Utc>,
	kind: ResourceKind,
	metadata: &ObjectMeta,
	counts: ReplicaCounts,
) -> ResourceSummary {
	ResourceSummary {
		kind,
		name: metadata.name.clone().unwrap_or_default(),
		status: if counts.is_ready() {
			"Running".to_string()
		} else {
			"Pending".to_string()
		},
		replicas: Some(format!("{}/{}", counts.ready, counts.desired)),
		age: age_of(now, metadata),
	}
}

/// Flatten controllers, services and claims into display rows.
pub fn summarize_resources(
	now: DateTime<Utc>,
	deployments: &[Deployment],
	stateful_sets: &[StatefulSet],
	services: &[Service],
	pvcs: &[PersistentVolumeClaim],
) -> Vec<ResourceSummary> {
	let mut rows = Vec::with_capacity(
		deployments.len() + stateful_sets.len() + services.len() + pvcs.len(),
	);

	for deployment in deployments {
		rows.push(controller_row(
			now,
			ResourceKind::Deployment,
			&deployment.metadata,
			deployment_replicas(deployment),
		));
	}

	for stateful_set in stateful_sets {
		rows.push(controller_row(
			now,
			ResourceKind::StatefulSet,
			&stateful_set.metadata,
			stateful_set_replicas(stateful_set),
		));
	}

	for service in services {
		rows.push(ResourceSummary {
			kind: ResourceKind::Service,
			name: service.metadata.name.clone().unwrap_or_default(),
			status: "Active".to_string(),
			replicas: None,
			age: age_of(now, &service.metadata),
		});
	}

	for pvc in pvcs {
		let bound = pvc
			.status
			.as_ref()
			.and_then(|s| s.phase.as_deref())
			.is_some_and(|phase| phase == "Bound");
		rows.push(ResourceSummary {
			kind: ResourceKind::Pvc,
			name: pvc.metadata.name.clone().unwrap_or_default(),
			status: if bound { "Bound" } else { "Pending" }.to_string(),
			replicas: None,
			age: age_of(now, &pvc.metadata),
		});
	}

	rows
}

pub fn summarize_events(events: &[Event]) -> Vec<EventSummary> {
	events
		.iter()
		.map(|event| {
			let at = event
				.last_timestamp
				.as_ref()
				.map(|t| t.0)
				.or_else(|| event.event_time.as_ref().map(|t| t.0));
			let event_type = match event.type_.as_deref() {
				Some("Warning") => EventType::Warning,
				Some("Error") => EventType::Error,
				_ => EventType::Normal,
			};
			EventSummary {
				timestamp: at
					.map(|t| t.format("%H:%M:%S").to_string())
					.unwrap_or_default(),
				message: event
					.message
					.clone()
					.or_else(|| event.reason.clone())
					.unwrap_or_default(),
				event_type,
			}
		})
		.collect()
}

/// True when at least one pod exists and every pod reports `Ready=True`.
pub fn pods_ready(pods: &[Pod]) -> bool {
	!pods.is_empty()
		&& pods.iter().all(|pod| {
			pod
				.status
				.as_ref()
				.and_then(|s| s.conditions.as_ref())
				.and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
				.is_some_and(|c| c.status == "True")
		})
}

/// Sum of container restart counts across pods.
pub fn count_restarts(pods: &[Pod]) -> u64 {
	pods
		.iter()
		.filter_map(|pod| pod.status.as_ref())
		.filter_map(|status| status.container_statuses.as_ref())
		.flatten()
		.map(|cs| cs.restart_count.max(0) as u64)
		.sum()
}

fn split_quantity(quantity: &str) -> (&str, &str) {
	let idx = quantity
		.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
		.unwrap_or(quantity.len());
	quantity.split_at(idx)
}

/// Parse a byte quantity (`512Mi`, `5Gi`, `1G`, `1048576`) into bytes.
pub fn parse_bytes(quantity: &str) -> Option<f64> {
	let (number, suffix) = split_quantity(quantity.trim());
	let value: f64 = number.parse().ok()?;
	let multiplier = match suffix {
		"" => 1.0,
		"Ki" => 1024.0,
		"Mi" => MIB,
		"Gi" => GIB,
		"Ti" => GIB * 1024.0,
		"Pi" => GIB * 1024.0 * 1024.0,
		"k" | "K" => 1e3,
		"M" => 1e6,
		"G" => 1e9,
		"T" => 1e12,
		"P" => 1e15,
		"m" => 1e-3,
		_ => return None,
	};
	Some(value * multiplier)
}

/// Parse a CPU quantity (`250m`, `0.5`, `2`) into millicores.
pub fn parse_cpu_millicores(quantity: &str) -> Option<f64> {
	let (number, suffix) = split_quantity(quantity.trim());
	let value: f64 = number.parse().ok()?;
	match suffix {
		"m" => Some(value),
		"" => Some(value * 1000.0),
		"u" => Some(value / 1000.0),
		"n" => Some(value / 1_000_000.0),
		"k" => Some(value * 1_000_000.0),
		_ => None,
	}
}

pub fn parse_memory_mib(quantity: &str) -> Option<f64> {
	parse_bytes(quantity).map(|bytes| bytes / MIB)
}

pub fn parse_storage_gib(quantity: &str) -> Option<f64> {
	parse_bytes(quantity).map(|bytes| bytes / GIB)
}

/// Requested CPU and memory over all containers plus claimed storage.
///
/// Unparseable quantities count as zero.
pub fn summarize_usage(pods: &[Pod], pvcs: &[PersistentVolumeClaim]) -> ResourceUsage {
	let mut cpu_millicores = 0.0;
	let mut memory_bytes = 0.0;

	for container in pods
		.iter()
		.filter_map(|pod| pod.spec.as_ref())
		.flat_map(|spec| spec.containers.iter())
	{
		let Some(requests) = container
			.resources
			.as_ref()
			.and_then(|r| r.requests.as_ref())
		else {
			continue;
		};
		if let Some(cpu) = requests.get("cpu") {
			cpu_millicores += parse_cpu_millicores(&cpu.0).unwrap_or(0.0);
		}
		if let Some(memory) = requests.get("memory") {
			memory_bytes += parse_bytes(&memory.0).unwrap_or(0.0);
		}
	}

	let storage_bytes: f64 = pvcs
		.iter()
		.filter_map(|pvc| pvc.status.as_ref())
		.filter_map(|status| status.capacity.as_ref())
		.filter_map(|capacity| capacity.get("storage"))
		.filter_map(|q| parse_bytes(&q.0))
		.sum();

	ResourceUsage {
		cpu_millicores: cpu_millicores.round().max(0.0) as u64,
		memory_mib: (memory_bytes / MIB).floor().max(0.0) as u64,
		storage_gib: (storage_bytes / GIB).max(0.0),
	}
}
