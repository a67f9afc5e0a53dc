use std::collections::HashMap;

use typed_index_collections::TiVec;

use crate::segments::TrainPlan;

pub type TimeValue = i64;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TrainId(u32);

impl From<TrainId> for usize {
    fn from(v: TrainId) -> Self {
        v.0 as usize
    }
}

impl From<usize> for TrainId {
    fn from(x: usize) -> Self {
        TrainId(x as u32)
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BucketId(u32);

impl From<BucketId> for usize {
    fn from(v: BucketId) -> Self {
        v.0 as usize
    }
}

impl From<usize> for BucketId {
    fn from(x: usize) -> Self {
        BucketId(x as u32)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelSegment {
    pub bucket: BucketId,
    pub duration: TimeValue,
}

#[derive(Debug)]
pub struct ModelTrain {
    /// Earliest permissible start of the first segment.
    pub release: TimeValue,
    /// Objective weight, `2^max(0, 4 - priority)`.
    pub weight: i64,
    pub segments: Vec<ModelSegment>,
}

/// All intervals competing for one track's capacity.
#[derive(Debug)]
pub struct ResourceBucket {
    pub track_id: String,
    pub capacity: u32,
    pub members: Vec<(TrainId, usize)>,
}

/// The solver-facing model: fixed-duration intervals chained per train,
/// grouped into capacity buckets per track, bounded by a horizon.
#[derive(Debug)]
pub struct SchedulingModel {
    pub trains: TiVec<TrainId, ModelTrain>,
    pub buckets: TiVec<BucketId, ResourceBucket>,
    pub horizon: TimeValue,
}

pub fn priority_weight(priority: i32) -> i64 {
    1i64 << (4 - priority as i64).clamp(0, 16)
}

impl SchedulingModel {
    pub fn build(plans: &[TrainPlan]) -> Self {
        let mut trains: TiVec<TrainId, ModelTrain> = TiVec::new();
        let mut buckets: TiVec<BucketId, ResourceBucket> = TiVec::new();
        let mut bucket_by_track: HashMap<String, BucketId> = HashMap::new();

        let mut total: TimeValue = 0;
        for plan in plans {
            let mut segments = Vec::with_capacity(plan.segments.len());
            for seg in plan.segments.iter() {
                let bucket = match bucket_by_track.get(seg.track_id.as_str()) {
                    Some(bucket) => {
                        let bucket = *bucket;
                        // keep the most restrictive capacity seen
                        buckets[bucket].capacity = buckets[bucket].capacity.min(seg.capacity);
                        bucket
                    }
                    None => {
                        let bucket = buckets.push_and_get_key(ResourceBucket {
                            track_id: seg.track_id.clone(),
                            capacity: seg.capacity,
                            members: Vec::new(),
                        });
                        bucket_by_track.insert(seg.track_id.clone(), bucket);
                        bucket
                    }
                };
                total += seg.duration as TimeValue;
                segments.push(ModelSegment {
                    bucket,
                    duration: seg.duration as TimeValue,
                });
            }
            let train_id = trains.push_and_get_key(ModelTrain {
                release: (plan.release_delay as TimeValue).max(0),
                weight: priority_weight(plan.priority),
                segments,
            });
            for (k, seg) in trains[train_id].segments.iter().enumerate() {
                buckets[seg.bucket].members.push((train_id, k));
            }
        }

        let mut horizon = 3 * total / 2 + 200;
        if horizon < 300 {
            horizon = 300;
        }

        SchedulingModel {
            trains,
            buckets,
            horizon,
        }
    }

    /// Weighted sum of last-segment completion times.
    pub fn objective(&self, starts: &TiVec<TrainId, Vec<TimeValue>>) -> i64 {
        let mut objective = 0i64;
        for (train_id, train) in self.trains.iter_enumerated() {
            if let Some(last) = train.segments.last() {
                let k = train.segments.len() - 1;
                objective += train.weight * (starts[train_id][k] + last.duration);
            }
        }
        objective
    }

    /// Re-checks a claimed solution against every constraint class and
    /// returns its objective value.
    pub fn verify(&self, starts: &TiVec<TrainId, Vec<TimeValue>>) -> Result<i64, String> {
        let _p = hprof::enter("verify solution");

        if starts.len() != self.trains.len() {
            return Err(format!(
                "expected start times for {} trains, got {}",
                self.trains.len(),
                starts.len()
            ));
        }

        for (train_id, train) in self.trains.iter_enumerated() {
            let times = &starts[train_id];
            if times.len() != train.segments.len() {
                return Err(format!(
                    "train {:?}: expected {} start times, got {}",
                    train_id,
                    train.segments.len(),
                    times.len()
                ));
            }
            let mut earliest = train.release;
            for (k, seg) in train.segments.iter().enumerate() {
                if times[k] < earliest {
                    return Err(format!(
                        "train {:?} segment {} starts at {} before {}",
                        train_id, k, times[k], earliest
                    ));
                }
                earliest = times[k] + seg.duration;
                if earliest > self.horizon {
                    return Err(format!(
                        "train {:?} segment {} ends at {} beyond horizon {}",
                        train_id, k, earliest, self.horizon
                    ));
                }
            }
        }

        for bucket in self.buckets.iter() {
            let spans: Vec<(TimeValue, TimeValue)> = bucket
                .members
                .iter()
                .map(|(train_id, k)| {
                    let start = starts[*train_id][*k];
                    (start, start + self.trains[*train_id].segments[*k].duration)
                })
                .collect();
            // the active count can only rise at a span's start instant
            for &(probe, _) in spans.iter() {
                let active = spans
                    .iter()
                    .filter(|(start, end)| *start <= probe && probe < *end)
                    .count();
                if active > bucket.capacity as usize {
                    return Err(format!(
                        "track {}: {} concurrent trains at minute {}, capacity {}",
                        bucket.track_id, active, probe, bucket.capacity
                    ));
                }
            }
        }

        Ok(self.objective(starts))
    }
}
