use common::model::raw_source::RawSource;
use std::collections::BTreeSet;

/// Raw sources whose marker occurs anywhere in `sql`.
///
/// Plain case-sensitive substring search: markers inside comments, string
/// literals or longer identifiers count too. Over-reporting is acceptable,
/// missing a reference is not.
pub fn detect(sql: Option<&str>) -> BTreeSet<RawSource> {
    let Some(sql) = sql else {
        return BTreeSet::new();
    };
    RawSource::ALL
        .into_iter()
        .filter(|source| sql.contains(source.marker()))
        .collect()
}
