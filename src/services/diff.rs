use serde::Serialize;

pub const DEFAULT_CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffLine {
    fn new(kind: DiffKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }

    /// The line with its unified-diff prefix
    pub fn render(&self) -> String {
        let prefix = match self.kind {
            DiffKind::Context => ' ',
            DiffKind::Added => '+',
            DiffKind::Removed => '-',
        };
        format!("{}{}", prefix, self.text)
    }
}

/// A run of changes plus surrounding context; starts are 0-based line indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            format_range(self.old_start, self.old_len),
            format_range(self.new_start, self.new_len)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Line diff of `a` against `b`, hunks flattened, `context_lines` of context around changes.
/// Equal inputs give no lines.
pub fn diff(a: &str, b: &str, context_lines: usize) -> Vec<DiffLine> {
    unified(a, b, context_lines)
        .into_iter()
        .flat_map(|hunk| hunk.lines)
        .collect()
}

/// Line diff of `a` against `b` grouped into hunks
pub fn unified(a: &str, b: &str, context_lines: usize) -> Vec<Hunk> {
    let old: Vec<&str> = a.lines().collect();
    let new: Vec<&str> = b.lines().collect();
    let script = edit_script(&old, &new);
    group_hunks(&script, &old, &new, context_lines)
}

/// Text form with `---`/`+++` headers; empty when there are no hunks
pub fn render_unified(from: &str, to: &str, hunks: &[Hunk]) -> String {
    if hunks.is_empty() {
        return String::new();
    }

    let mut out = vec![format!("--- {}", from), format!("+++ {}", to)];
    for hunk in hunks {
        out.push(hunk.header());
        out.extend(hunk.lines.iter().map(DiffLine::render));
    }
    out.join("\n")
}

/// Edit script via Myers' O(ND) algorithm, bisecting on the middle snake so
/// memory stays linear in the input.
fn edit_script(old: &[&str], new: &[&str]) -> Vec<Op> {
    let mut ops = Vec::with_capacity(old.len() + new.len());
    diff_between(old, new, &mut ops);
    ops
}

fn diff_between(old: &[&str], new: &[&str], ops: &mut Vec<Op>) {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    ops.extend(std::iter::repeat_n(Op::Equal, prefix));
    match middle_snake(a, b) {
        Some((x, y)) => {
            diff_between(&a[..x], &b[..y], ops);
            diff_between(&a[x..], &b[y..], ops);
        }
        None => {
            ops.extend(std::iter::repeat_n(Op::Delete, a.len()));
            ops.extend(std::iter::repeat_n(Op::Insert, b.len()));
        }
    }
    ops.extend(std::iter::repeat_n(Op::Equal, suffix));
}

/// Split point `(x, y)` where forward and reverse searches meet.
///
/// `a` and `b` must differ in their first and last lines. Returns `None` when
/// either side is empty or no split would shrink the problem; the caller then
/// deletes `a` and inserts `b` wholesale.
fn middle_snake(a: &[&str], b: &[&str]) -> Option<(usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let (n, m) = (a.len() as isize, b.len() as isize);
    let max_d = (n + m + 1) / 2;
    let offset = max_d + 1;
    let width = 2 * offset + 1;
    let delta = n - m;
    // with an odd delta the paths meet during a forward step, otherwise a reverse one
    let meet_forward = delta % 2 != 0;

    // furthest x per diagonal k = x - y; -1 marks unreached
    let mut forward = vec![-1isize; width as usize];
    let mut reverse = vec![-1isize; width as usize];
    forward[(offset + 1) as usize] = 0;
    reverse[(offset + 1) as usize] = 0;

    // diagonals that ran off the grid are skipped from then on
    let (mut f_start, mut f_end, mut r_start, mut r_end) = (0isize, 0isize, 0isize, 0isize);

    let split = |x: isize, y: isize| -> Option<(usize, usize)> {
        let on_grid = (0..=n).contains(&x) && (0..=m).contains(&y);
        let shrinks = (x, y) != (0, 0) && (x, y) != (n, m);
        (on_grid && shrinks).then_some((x as usize, y as usize))
    };

    for d in 0..max_d {
        let mut k = -d + f_start;
        while k <= d - f_end {
            let i = (offset + k) as usize;
            let mut x = if k == -d || (k != d && forward[i - 1] < forward[i + 1]) {
                forward[i + 1]
            } else {
                forward[i - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            forward[i] = x;

            if x > n {
                f_end += 2;
            } else if y > m {
                f_start += 2;
            } else if meet_forward {
                let j = offset + delta - k;
                if (0..width).contains(&j) && reverse[j as usize] != -1 && x >= n - reverse[j as usize] {
                    return split(x, y);
                }
            }
            k += 2;
        }

        let mut k = -d + r_start;
        while k <= d - r_end {
            let i = (offset + k) as usize;
            let mut x = if k == -d || (k != d && reverse[i - 1] < reverse[i + 1]) {
                reverse[i + 1]
            } else {
                reverse[i - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[(n - x - 1) as usize] == b[(m - y - 1) as usize] {
                x += 1;
                y += 1;
            }
            reverse[i] = x;

            if x > n {
                r_end += 2;
            } else if y > m {
                r_start += 2;
            } else if !meet_forward {
                let j = offset + delta - k;
                if (0..width).contains(&j) && forward[j as usize] != -1 {
                    let fx = forward[j as usize];
                    let fy = fx - (delta - k);
                    if fx >= n - x {
                        return split(fx, fy);
                    }
                }
            }
            k += 2;
        }
    }

    None
}

fn group_hunks(ops: &[Op], old: &[&str], new: &[&str], context: usize) -> Vec<Hunk> {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| **op != Op::Equal)
        .map(|(idx, _)| idx)
        .collect();

    let Some((&first, rest)) = changes.split_first() else {
        return Vec::new();
    };

    // op index ranges covered by each hunk
    let mut ranges = Vec::new();
    let mut start = first.saturating_sub(context);
    let mut last = first;
    for &change in rest {
        let gap = change - last - 1;
        if gap > context.saturating_mul(2) {
            ranges.push(start..last.saturating_add(context).saturating_add(1).min(ops.len()));
            start = change - context.min(change);
        }
        last = change;
    }
    ranges.push(start..last.saturating_add(context).saturating_add(1).min(ops.len()));

    // line positions in old/new before each op
    let mut positions = Vec::with_capacity(ops.len() + 1);
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    for op in ops {
        positions.push((old_pos, new_pos));
        match op {
            Op::Equal => {
                old_pos += 1;
                new_pos += 1;
            }
            Op::Delete => old_pos += 1,
            Op::Insert => new_pos += 1,
        }
    }
    positions.push((old_pos, new_pos));

    ranges
        .into_iter()
        .map(|range| {
            let (old_start, new_start) = positions[range.start];
            let (old_end, new_end) = positions[range.end];
            let lines = ops[range]
                .iter()
                .scan((old_start, new_start), |(o, n), op| {
                    let line = match op {
                        Op::Equal => {
                            let line = DiffLine::new(DiffKind::Context, old[*o]);
                            *o += 1;
                            *n += 1;
                            line
                        }
                        Op::Delete => {
                            let line = DiffLine::new(DiffKind::Removed, old[*o]);
                            *o += 1;
                            line
                        }
                        Op::Insert => {
                            let line = DiffLine::new(DiffKind::Added, new[*n]);
                            *n += 1;
                            line
                        }
                    };
                    Some(line)
                })
                .collect();

            Hunk {
                old_start,
                old_len: old_end - old_start,
                new_start,
                new_len: new_end - new_start,
                lines,
            }
        })
        .collect()
}

fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
