//! # Aggregator
//!
//! Folds a batch of new or updated songs into creation candidates for albums
//! and artists the store has not seen yet.
//!
//! Statistics on the candidates describe only the batch. The writer's
//! recompute pass (step 6) replaces them with values derived from the full
//! song set, so the aggregator never has to know what is already stored.
//!
//! ## Tie-break
//!
//! Groups are emitted in first-seen source order, and an album's
//! representative year is the year of the first song seen for it. Callers that
//! need output independent of input order should sort the batch by path first.
//!
//! Names are grouped by exact equality. Case folding, if any, belongs to the
//! lookup closures.

use bridge_traits::TrackRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A previously-unseen album keyed by `(name, artist)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumCandidate {
    pub name: String,
    pub artist: String,
    pub song_count: i64,
    pub total_duration_ms: i64,
    pub year: Option<i32>,
}

/// A previously-unseen artist keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCandidate {
    pub name: String,
    pub song_count: i64,
    /// Distinct album names among the batch songs of this artist
    pub album_count: i64,
    pub total_duration_ms: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub new_albums: Vec<AlbumCandidate>,
    pub new_artists: Vec<ArtistCandidate>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.new_albums.is_empty() && self.new_artists.is_empty()
    }
}

struct ArtistGroup {
    candidate: ArtistCandidate,
    albums: HashSet<String>,
}

/// Group `songs` and propose creation of every album and artist for which the
/// lookup reports nothing stored.
pub fn aggregate<A, R>(songs: &[TrackRecord], album_exists: A, artist_exists: R) -> AggregationResult
where
    A: Fn(&str, &str) -> bool,
    R: Fn(&str) -> bool,
{
    let mut albums: Vec<AlbumCandidate> = Vec::new();
    let mut album_index: HashMap<(&str, &str), usize> = HashMap::new();

    let mut artists: Vec<ArtistGroup> = Vec::new();
    let mut artist_index: HashMap<&str, usize> = HashMap::new();

    for song in songs {
        let album_key = (song.album.as_str(), song.artist.as_str());
        match album_index.get(&album_key) {
            Some(&i) => {
                let album = &mut albums[i];
                album.song_count += 1;
                album.total_duration_ms += song.duration_ms;
            }
            None => {
                album_index.insert(album_key, albums.len());
                albums.push(AlbumCandidate {
                    name: song.album.clone(),
                    artist: song.artist.clone(),
                    song_count: 1,
                    total_duration_ms: song.duration_ms,
                    year: song.year,
                });
            }
        }

        let group = match artist_index.get(song.artist.as_str()) {
            Some(&i) => &mut artists[i],
            None => {
                artist_index.insert(song.artist.as_str(), artists.len());
                artists.push(ArtistGroup {
                    candidate: ArtistCandidate {
                        name: song.artist.clone(),
                        song_count: 0,
                        album_count: 0,
                        total_duration_ms: 0,
                    },
                    albums: HashSet::new(),
                });
                let last = artists.len() - 1;
                &mut artists[last]
            }
        };
        group.candidate.song_count += 1;
        group.candidate.total_duration_ms += song.duration_ms;
        if group.albums.insert(song.album.clone()) {
            group.candidate.album_count += 1;
        }
    }

    AggregationResult {
        new_albums: albums
            .into_iter()
            .filter(|a| !album_exists(&a.name, &a.artist))
            .collect(),
        new_artists: artists
            .into_iter()
            .map(|g| g.candidate)
            .filter(|a| !artist_exists(&a.name))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(path: &str, artist: &str, album: &str, duration_ms: i64) -> TrackRecord {
        TrackRecord::new(path, path, artist, album, duration_ms, 1)
    }

    #[test]
    fn test_fresh_store_proposes_everything() {
        let songs = vec![
            song("/a", "Artist1", "Album1", 200_000),
            song("/b", "Artist1", "Album1", 180_000),
            song("/c", "Artist2", "Album2", 300_000),
        ];

        let result = aggregate(&songs, |_, _| false, |_| false);

        assert_eq!(result.new_albums.len(), 2);
        assert_eq!(result.new_artists.len(), 2);

        let album1 = &result.new_albums[0];
        assert_eq!(album1.name, "Album1");
        assert_eq!(album1.song_count, 2);
        assert_eq!(album1.total_duration_ms, 380_000);

        let artist1 = &result.new_artists[0];
        assert_eq!(artist1.name, "Artist1");
        assert_eq!(artist1.song_count, 2);
        assert_eq!(artist1.album_count, 1);
    }

    #[test]
    fn test_existing_entities_are_not_proposed() {
        let songs = vec![
            song("/a", "Artist1", "Album1", 1),
            song("/c", "Artist2", "Album2", 1),
        ];

        let result = aggregate(
            &songs,
            |name, artist| name == "Album1" && artist == "Artist1",
            |name| name == "Artist1",
        );

        assert_eq!(result.new_albums.len(), 1);
        assert_eq!(result.new_albums[0].name, "Album2");
        assert_eq!(result.new_artists.len(), 1);
        assert_eq!(result.new_artists[0].name, "Artist2");
    }

    #[test]
    fn test_same_album_name_under_two_artists() {
        let songs = vec![
            song("/a", "Artist1", "Greatest Hits", 1),
            song("/b", "Artist2", "Greatest Hits", 1),
        ];

        let result = aggregate(&songs, |_, _| false, |_| false);
        assert_eq!(result.new_albums.len(), 2);
    }

    #[test]
    fn test_artist_album_count_is_distinct_names() {
        let songs = vec![
            song("/a", "Artist1", "Album1", 1),
            song("/b", "Artist1", "Album2", 1),
            song("/c", "Artist1", "Album1", 1),
        ];

        let result = aggregate(&songs, |_, _| false, |_| false);
        assert_eq!(result.new_artists[0].song_count, 3);
        assert_eq!(result.new_artists[0].album_count, 2);
    }

    #[test]
    fn test_year_is_first_song_in_source_order() {
        let songs = vec![
            song("/b", "Artist1", "Album1", 1).with_year(2004),
            song("/a", "Artist1", "Album1", 1).with_year(1999),
        ];

        let result = aggregate(&songs, |_, _| false, |_| false);
        assert_eq!(result.new_albums[0].year, Some(2004));
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let songs = vec![
            song("/z", "Zed", "Zulu", 1),
            song("/a", "Abba", "Arrival", 1),
            song("/y", "Zed", "Zulu", 1),
        ];

        let result = aggregate(&songs, |_, _| false, |_| false);
        let names: Vec<&str> = result.new_artists.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Abba"]);
    }

    #[test]
    fn test_case_variants_are_distinct_without_normalizing_lookup() {
        let songs = vec![
            song("/a", "The Beatles", "Abbey Road", 1),
            song("/b", "the beatles", "Abbey Road", 1),
        ];

        let result = aggregate(&songs, |_, _| false, |_| false);
        assert_eq!(result.new_artists.len(), 2);

        let folded = aggregate(&songs, |_, _| false, |name| name == "the beatles");
        assert_eq!(folded.new_artists.len(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let result = aggregate(&[], |_, _| false, |_| false);
        assert!(result.is_empty());
    }
}
