use std::collections::HashMap;

use log::debug;

use crate::input::Track;

/// Station-pair lookup over the track list. Both directions of every
/// track are inserted, so traversal direction does not matter to callers.
pub struct NetworkIndex<'a> {
    pairs: HashMap<(&'a str, &'a str), &'a Track>,
}

impl<'a> NetworkIndex<'a> {
    pub fn build(tracks: &'a [Track]) -> Self {
        let mut pairs: HashMap<(&'a str, &'a str), &'a Track> = HashMap::new();
        for track in tracks {
            let forward = (track.source.as_str(), track.destination.as_str());
            let reverse = (track.destination.as_str(), track.source.as_str());
            if let Some(previous) = pairs.insert(forward, track) {
                debug!(
                    "track {} replaces {} between {} and {}",
                    track.id, previous.id, forward.0, forward.1
                );
            }
            pairs.insert(reverse, track);
        }
        NetworkIndex { pairs }
    }

    /// Track usable between the two stations, if any.
    pub fn find(&self, from: &str, to: &str) -> Option<&'a Track> {
        self.pairs.get(&(from, to)).copied()
    }
}
