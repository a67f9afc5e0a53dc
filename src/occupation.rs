use log::{trace, warn};
use tinyvec::TinyVec;
use typed_index_collections::TiVec;

use crate::interval::TimeInterval;
use crate::problem::{BucketId, SchedulingModel, TimeValue, TrainId};

/// One train's segment occupying a track for a fixed interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceOccupation {
    pub interval: TimeInterval,
    pub train: TrainId,
    pub segment: u32,
}

/// The occupations of one capacity bucket, sorted by start time.
#[derive(Debug)]
pub struct ResourceTimeline {
    pub capacity: u32,
    pub occupations: TinyVec<[ResourceOccupation; 32]>,
}

impl ResourceTimeline {
    pub fn new(capacity: u32) -> Self {
        ResourceTimeline {
            capacity,
            occupations: TinyVec::new(),
        }
    }

    pub fn add(&mut self, occ: ResourceOccupation) {
        match self.occupations.binary_search(&occ) {
            Ok(_) => {
                warn!("duplicate occupation {:?}", occ);
            }
            Err(idx) => {
                self.occupations.insert(idx, occ);
            }
        }
    }

    fn active_at(&self, time: TimeValue) -> impl Iterator<Item = &ResourceOccupation> + '_ {
        self.occupations
            .iter()
            .filter(move |occ| occ.interval.contains(time))
    }

    /// The earliest instant where more than `capacity` occupations are
    /// active, together with the active set. The active count only rises
    /// at start instants, so probing starts is exhaustive.
    pub fn first_overload(&self) -> Option<(TimeValue, Vec<ResourceOccupation>)> {
        for probe in self.occupations.iter() {
            let time = probe.interval.time_start;
            let active: Vec<ResourceOccupation> = self.active_at(time).copied().collect();
            if active.len() > self.capacity as usize {
                return Some((time, active));
            }
        }
        None
    }

    /// If the bucket is full at `time`, the earliest end among the
    /// active occupations, which is the next instant the count can drop.
    pub fn blocked_at(&self, time: TimeValue) -> Option<TimeValue> {
        let mut active = 0usize;
        let mut next_end = TimeValue::MAX;
        for occ in self.active_at(time) {
            active += 1;
            next_end = next_end.min(occ.interval.time_end);
        }
        (active >= self.capacity as usize).then(|| next_end)
    }

    /// Earliest start `t >= after` such that `[t, t+duration)` fits
    /// without exceeding the capacity. Jumping to the earliest end of a
    /// blocking set never skips a feasible start, because every member
    /// of that set is still active at any earlier candidate.
    pub fn earliest_slot(&self, after: TimeValue, duration: TimeValue) -> TimeValue {
        let mut t = after;
        'probe: loop {
            if let Some(next_end) = self.blocked_at(t) {
                t = next_end;
                continue 'probe;
            }
            for occ in self.occupations.iter() {
                let start = occ.interval.time_start;
                if start > t && start < t + duration {
                    if let Some(next_end) = self.blocked_at(start) {
                        t = next_end;
                        continue 'probe;
                    }
                }
            }
            return t;
        }
    }
}

/// Per-bucket timelines for a whole schedule.
#[derive(Debug)]
pub struct ResourceConflicts {
    pub resources: TiVec<BucketId, ResourceTimeline>,
}

impl ResourceConflicts {
    pub fn empty(model: &SchedulingModel) -> Self {
        ResourceConflicts {
            resources: model
                .buckets
                .iter()
                .map(|bucket| ResourceTimeline::new(bucket.capacity))
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        for resource in self.resources.iter_mut() {
            resource.occupations.clear();
        }
    }

    pub fn add(&mut self, bucket: BucketId, occ: ResourceOccupation) {
        trace!("occupy {:?} {:?}", bucket, occ);
        self.resources[bucket].add(occ);
    }

    /// Rebuilds all timelines from a full schedule.
    pub fn load(&mut self, model: &SchedulingModel, starts: &TiVec<TrainId, Vec<TimeValue>>) {
        self.clear();
        for (train_id, train) in model.trains.iter_enumerated() {
            for (k, seg) in train.segments.iter().enumerate() {
                self.add(
                    seg.bucket,
                    ResourceOccupation {
                        interval: TimeInterval::duration(starts[train_id][k], seg.duration),
                        train: train_id,
                        segment: k as u32,
                    },
                );
            }
        }
    }

    /// The overload with the smallest time over all buckets. Ties keep
    /// the lowest bucket id.
    pub fn first_overload(&self) -> Option<(BucketId, TimeValue, Vec<ResourceOccupation>)> {
        let mut found: Option<(BucketId, TimeValue, Vec<ResourceOccupation>)> = None;
        for (bucket_id, resource) in self.resources.iter_enumerated() {
            if let Some((time, members)) = resource.first_overload() {
                let earlier = match &found {
                    Some((_, best, _)) => time < *best,
                    None => true,
                };
                if earlier {
                    found = Some((bucket_id, time, members));
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(train: usize, segment: u32, start: TimeValue, end: TimeValue) -> ResourceOccupation {
        ResourceOccupation {
            interval: TimeInterval {
                time_start: start,
                time_end: end,
            },
            train: TrainId::from(train),
            segment,
        }
    }

    #[test]
    fn single_capacity_overload_is_found_at_second_start() {
        let mut timeline = ResourceTimeline::new(1);
        timeline.add(occ(0, 0, 0, 62));
        timeline.add(occ(1, 0, 10, 72));
        let (time, members) = timeline.first_overload().unwrap();
        assert_eq!(time, 10);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn double_capacity_admits_two_but_not_three() {
        let mut timeline = ResourceTimeline::new(2);
        timeline.add(occ(0, 0, 0, 10));
        timeline.add(occ(1, 0, 0, 10));
        assert_eq!(timeline.first_overload(), None);

        timeline.add(occ(2, 0, 5, 15));
        let (time, members) = timeline.first_overload().unwrap();
        assert_eq!(time, 5);
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn back_to_back_occupations_do_not_overload() {
        let mut timeline = ResourceTimeline::new(1);
        timeline.add(occ(0, 0, 0, 62));
        timeline.add(occ(1, 0, 62, 124));
        assert_eq!(timeline.first_overload(), None);
    }

    #[test]
    fn earliest_slot_waits_for_the_blocking_train() {
        let mut timeline = ResourceTimeline::new(1);
        timeline.add(occ(0, 0, 0, 62));
        assert_eq!(timeline.earliest_slot(0, 62), 62);
        assert_eq!(timeline.earliest_slot(70, 10), 70);
    }

    #[test]
    fn earliest_slot_skips_windows_cut_by_a_later_start() {
        let mut timeline = ResourceTimeline::new(1);
        timeline.add(occ(0, 0, 10, 20));
        // [8, 13) would collide with the start at 10
        assert_eq!(timeline.earliest_slot(8, 5), 20);
        assert_eq!(timeline.earliest_slot(0, 10), 0);
    }

    #[test]
    fn earliest_slot_uses_spare_capacity() {
        let mut timeline = ResourceTimeline::new(2);
        timeline.add(occ(0, 0, 0, 30));
        assert_eq!(timeline.earliest_slot(0, 10), 0);

        timeline.add(occ(1, 0, 0, 30));
        assert_eq!(timeline.earliest_slot(0, 10), 30);
    }
}
