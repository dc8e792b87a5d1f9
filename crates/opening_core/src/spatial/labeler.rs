//! # Position Labeler
//!
//! Names raw density clusters by matching their centroids against a
//! [`PositionTemplate`].
//!
//! ## Matching
//!
//! Every (cluster, slot) pair is ranked by centroid-to-slot distance. Pairs are
//! taken greedily from the closest; a pair is accepted when neither the
//! cluster nor the slot has been claimed. Equal distances go to the cluster
//! with more members, then to the lower cluster id, so the loser falls back to
//! its next-nearest unclaimed slot.
//!
//! ## Count mismatches
//!
//! - Fewer clusters than slots: the leftover slots are reported as missing.
//! - More clusters than slots: a surplus cluster adopts the label of the
//!   nearest matched cluster when it lies within the merge tolerance, and is
//!   marked [`UNLABELED`] otherwise.

use crate::config::MapSpec;
use crate::data::PositionTemplate;
use crate::error::AnalysisWarning;
use crate::models::{ClusterGeometry, MapPoint, UNLABELED};
use std::cmp::{Ordering, Reverse};
use tracing::{debug, warn};

/// Label decision for one raw cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterLabel {
    pub label: String,
    /// Set when a surplus cluster adopted a neighbor's label.
    pub merged_into: Option<usize>,
}

impl ClusterLabel {
    pub fn is_labeled(&self) -> bool {
        self.label != UNLABELED
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Labeling {
    /// Indexed by raw cluster id.
    pub clusters: Vec<ClusterLabel>,
    pub geometry: Vec<ClusterGeometry>,
    /// Template labels no cluster claimed, in template order.
    pub missing_labels: Vec<String>,
    /// Surplus clusters merged into a labeled neighbor.
    pub merged: Vec<usize>,
    /// Surplus clusters too far from any labeled neighbor.
    pub unlabeled: Vec<usize>,
}

impl Labeling {
    pub fn label_of(&self, cluster: usize) -> &str {
        &self.clusters[cluster].label
    }

    pub fn warnings(&self) -> Vec<AnalysisWarning> {
        let mut warnings = Vec::new();
        if !self.missing_labels.is_empty() {
            warnings.push(AnalysisWarning::MissingLabels {
                labels: self.missing_labels.clone(),
            });
        }
        if !self.merged.is_empty() || !self.unlabeled.is_empty() {
            warnings.push(AnalysisWarning::SurplusClusters {
                merged: self.merged.clone(),
                unlabeled: self.unlabeled.clone(),
            });
        }
        warnings
    }
}

/// Distance from `point` to the x = z axis.
pub fn distance_to_front(point: &MapPoint) -> f64 {
    (point.x - point.z).abs() / std::f64::consts::SQRT_2
}

/// Geometric features of each centroid relative to the map and each other.
pub fn cluster_geometry(centroids: &[MapPoint], map: &MapSpec) -> Vec<ClusterGeometry> {
    let (cx, cz) = map.center();
    let center = MapPoint::new(cx, cz);

    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let nearest_neighbor_dist = centroids
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| c.distance(other))
                .min_by(|a, b| a.total_cmp(b));
            ClusterGeometry {
                dist_from_center: c.distance(&center),
                dist_from_front: distance_to_front(c),
                nearest_neighbor_dist,
            }
        })
        .collect()
}

/// Geometry of a point measured against a fixed set of cluster centroids.
pub fn point_geometry(point: &MapPoint, centroids: &[MapPoint], map: &MapSpec) -> ClusterGeometry {
    let (cx, cz) = map.center();
    ClusterGeometry {
        dist_from_center: point.distance(&MapPoint::new(cx, cz)),
        dist_from_front: distance_to_front(point),
        nearest_neighbor_dist: centroids
            .iter()
            .map(|c| point.distance(c))
            .min_by(|a, b| a.total_cmp(b)),
    }
}

/// Assign template labels to clusters.
///
/// # Arguments
/// * `centroids` - Cluster centroids in the canonical frame, by raw id
/// * `member_counts` - Member count per raw id
/// * `merge_tolerance` - Max distance for a surplus cluster to adopt a label
pub fn label_clusters(
    centroids: &[MapPoint],
    member_counts: &[usize],
    template: &PositionTemplate,
    map: &MapSpec,
    merge_tolerance: f64,
) -> Labeling {
    let slot_points: Vec<MapPoint> = template
        .slots
        .iter()
        .map(|slot| {
            let (x, z) = slot.position(map);
            MapPoint::new(x, z)
        })
        .collect();

    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(centroids.len() * slot_points.len());
    for (cluster, centroid) in centroids.iter().enumerate() {
        for (slot, slot_point) in slot_points.iter().enumerate() {
            candidates.push((centroid.distance(slot_point), cluster, slot));
        }
    }
    candidates.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| Reverse(member_counts[a.1]).cmp(&Reverse(member_counts[b.1])))
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut slot_of_cluster: Vec<Option<usize>> = vec![None; centroids.len()];
    let mut slot_taken = vec![false; slot_points.len()];
    let mut remaining = centroids.len().min(slot_points.len());

    for (dist, cluster, slot) in candidates {
        if remaining == 0 {
            break;
        }
        if slot_of_cluster[cluster].is_some() || slot_taken[slot] {
            continue;
        }
        debug!(
            "Cluster {} -> {} (distance {:.0})",
            cluster, template.slots[slot].label, dist
        );
        slot_of_cluster[cluster] = Some(slot);
        slot_taken[slot] = true;
        remaining -= 1;
    }

    let mut clusters: Vec<ClusterLabel> = slot_of_cluster
        .iter()
        .map(|slot| ClusterLabel {
            label: slot
                .map(|s| template.slots[s].label.clone())
                .unwrap_or_else(|| UNLABELED.to_string()),
            merged_into: None,
        })
        .collect();

    let mut merged = Vec::new();
    let mut unlabeled = Vec::new();
    for cluster in 0..centroids.len() {
        if slot_of_cluster[cluster].is_some() {
            continue;
        }

        let nearest = (0..centroids.len())
            .filter(|&other| slot_of_cluster[other].is_some())
            .map(|other| (centroids[cluster].distance(&centroids[other]), other))
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        match nearest {
            Some((dist, other)) if dist <= merge_tolerance => {
                debug!(
                    "Surplus cluster {} merged into cluster {} ({:.0} apart)",
                    cluster, other, dist
                );
                clusters[cluster] = ClusterLabel {
                    label: clusters[other].label.clone(),
                    merged_into: Some(other),
                };
                merged.push(cluster);
            }
            _ => unlabeled.push(cluster),
        }
    }

    let missing_labels: Vec<String> = template
        .slots
        .iter()
        .zip(&slot_taken)
        .filter(|(_, taken)| !**taken)
        .map(|(slot, _)| slot.label.clone())
        .collect();

    if !missing_labels.is_empty() {
        warn!(
            "Only {} of {} positions formed; unassigned: {}",
            template.len() - missing_labels.len(),
            template.len(),
            missing_labels.join(", ")
        );
    }
    if !merged.is_empty() || !unlabeled.is_empty() {
        warn!(
            "{} surplus clusters: {} merged, {} unlabeled",
            merged.len() + unlabeled.len(),
            merged.len(),
            unlabeled.len()
        );
    }

    Labeling {
        clusters,
        geometry: cluster_geometry(centroids, map),
        missing_labels,
        merged,
        unlabeled,
    }
}

/// Order used by reports: labeled clusters in template order, then the rest
/// by raw id.
pub fn template_order(labeling: &Labeling, template: &PositionTemplate) -> Vec<usize> {
    let rank = |label: &str| {
        template
            .labels()
            .position(|l| l == label)
            .unwrap_or(usize::MAX)
    };
    let mut order: Vec<usize> = (0..labeling.clusters.len()).collect();
    order.sort_by(|&a, &b| match rank(labeling.label_of(a)).cmp(&rank(labeling.label_of(b))) {
        Ordering::Equal => a.cmp(&b),
        other => other,
    });
    order
}
