//! Display titles and search queries built from song metadata.

use crate::error::FormatError;
use crate::models::Song;

/// Template variables understood by [`format_query`].
pub const VARS: [&str; 19] = [
    "{title}",
    "{artists}",
    "{artist}",
    "{album}",
    "{album-artist}",
    "{genre}",
    "{disc-number}",
    "{disc-count}",
    "{duration}",
    "{year}",
    "{original-date}",
    "{track-number}",
    "{tracks-count}",
    "{isrc}",
    "{track-id}",
    "{publisher}",
    "{list-length}",
    "{list-position}",
    "{output-ext}",
];

/// Prefix added to templates that use none of [`VARS`].
const DEFAULT_QUERY_PREFIX: &str = "{artist} - {title}";

/// "Artist1, Artist2 - Name", or just the name when there are no artists.
pub fn create_song_title(song_name: &str, song_artists: &[String]) -> String {
    if song_artists.is_empty() {
        return song_name.to_string();
    }

    format!("{} - {}", song_artists.join(", "), song_name)
}

/// Strip characters that are not allowed in file names.
/// Double quotes and colons are kept as `'` and `-`.
pub fn sanitize_string(s: &str) -> String {
    s.chars()
        .filter(|c| !"/?\\*|<>".contains(*c))
        .collect::<String>()
        .replace('"', "'")
        .replace(':', "-")
}

/// Replace template variables with the song's values.
///
/// Missing optional values render as an empty string. `short` renders
/// `{artists}` as the primary artist only. `{list-position}` is zero-padded to
/// the width of the list length.
pub fn format_query(
    song: &Song,
    template: &str,
    sanitize: bool,
    file_extension: Option<&str>,
    short: bool,
) -> Result<String, FormatError> {
    if template.contains("{output-ext}") && file_extension.is_none() {
        return Err(FormatError::MissingExtension);
    }

    let primary_artist = song.artists.first().cloned().unwrap_or_default();
    let artists = if short {
        primary_artist.clone()
    } else {
        song.artists.join(", ")
    };

    let (position, length) = match (song.list_position, song.list_length) {
        (Some(pos), Some(len)) => {
            let width = len.to_string().len();
            (format!("{:0width$}", pos, width = width), len.to_string())
        }
        _ => (String::new(), String::new()),
    };

    let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();
    let text = |s: &Option<String>| s.clone().unwrap_or_default();

    let formats: [(&str, String); 19] = [
        ("{title}", song.name.clone()),
        ("{artists}", artists),
        ("{artist}", primary_artist),
        ("{album}", text(&song.album_name)),
        ("{album-artist}", text(&song.album_artist)),
        ("{genre}", song.genres.first().cloned().unwrap_or_default()),
        ("{disc-number}", number(song.disc_number)),
        ("{disc-count}", number(song.disc_count)),
        ("{duration}", format!("{}", song.duration.round() as i64)),
        ("{year}", text(&song.year)),
        ("{original-date}", text(&song.date)),
        ("{track-number}", number(song.track_number)),
        ("{tracks-count}", number(song.tracks_count)),
        ("{isrc}", text(&song.isrc)),
        ("{track-id}", text(&song.song_id)),
        ("{publisher}", text(&song.publisher)),
        ("{list-position}", position),
        ("{list-length}", length),
        ("{output-ext}", file_extension.unwrap_or_default().to_string()),
    ];

    let mut result = template.to_string();
    for (key, value) in formats {
        let value = if sanitize { sanitize_string(&value) } else { value };
        result = result.replace(key, &value);
    }

    Ok(result)
}

/// Search query for a song from a user template.
/// Templates without any variable get "{artist} - {title}" prepended.
pub fn create_search_query(
    song: &Song,
    template: &str,
    sanitize: bool,
    file_extension: Option<&str>,
    short: bool,
) -> Result<String, FormatError> {
    if VARS.iter().any(|key| template.contains(key)) {
        format_query(song, template, sanitize, file_extension, short)
    } else {
        let template = format!("{}{}", DEFAULT_QUERY_PREFIX, template);
        format_query(song, &template, sanitize, file_extension, short)
    }
}

/// Convert "h:m:s", "m:s" or "s" into seconds. Anything unparsable or too
/// large for an `i64` is 0.0.
/// e.g., "3:16" → 196.0, "25:59:59" → 93599.0
pub fn parse_duration(duration: Option<&str>) -> f64 {
    let Some(duration) = duration else {
        return 0.0;
    };

    let mut seconds: i64 = 0;
    for (multiplier, part) in [1i64, 60, 3600].iter().zip(duration.split(':').rev()) {
        let total = part
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|value| value.checked_mul(*multiplier))
            .and_then(|value| seconds.checked_add(value));
        match total {
            Some(total) => seconds = total,
            None => return 0.0,
        }
    }

    seconds as f64
}
