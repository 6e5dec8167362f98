/*!
 * Variable Name Patterns
 * Glob-style matching with `*` wildcards, decided locally by the engine
 * (structural patterns go to the external matcher; variable names do not)
 */

/// Match a variable name against a pattern where `*` matches any run of
/// characters (including none). Matching is case-sensitive and total.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = name.chars().collect();

    // Two-pointer scan with backtracking to the last `*`
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            // Let the last star absorb one more character
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    pat[p..].iter().all(|&c| c == '*')
}
