//! Fixed scoring weights

/// Score every URL starts from
pub const BASE_SCORE: i64 = 100;

/// Subtracted once per non-empty path segment
pub const DEPTH_PENALTY: i64 = 5;

/// Subtracted when the path contains a `/yyyy/mm` date
pub const DATE_PENALTY: i64 = 15;

/// Added for the site root
pub const ROOT_BONUS: i64 = 50;

/// Substring weights matched against the lowercased URL
///
/// Every matching entry applies, so `/blog/` posts get both the `blog`
/// penalty and the `/blog/` boost.
pub const KEYWORD_WEIGHTS: &[(&str, i64)] = &[
    // Commercial
    ("product", 10),
    ("service", 10),
    ("pricing", 12),
    ("buy", 10),
    ("shop", 8),
    ("demo", 12),
    ("solutions", 8),
    ("features", 8),
    ("case-study", 8),
    ("integration", 7),
    // Pillar and reference content
    ("docs", 3),
    ("api", 4),
    ("guide", 7),
    ("tutorial", 6),
    ("learn", 7),
    ("hub", 9),
    ("pillar", 9),
    ("guides", 8),
    // Navigational
    ("contact", 5),
    ("about", 5),
    // Listing, legal and taxonomy pages
    ("blog", -5),
    ("/blog/", 2),
    ("policy", -15),
    ("terms", -15),
    ("legal", -15),
    ("author", -10),
    ("tag", -10),
    ("category", -10),
    ("page/", -20),
];

/// Path extensions of non-page assets; such URLs score zero
pub const ASSET_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "webp", "svg", "zip", "gz", "xml", "css", "js",
];
