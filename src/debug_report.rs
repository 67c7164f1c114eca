use hostsort::{FolderPool, ResolutionVerbose, VerdictValue};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_host(verbose: &ResolutionVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let res = &verbose.resolution;

    println!("\n{}", palette.bold(palette.paint(format!("⚙  Host: {}", res.hostname), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    for trace in &verbose.details.traces {
        let status = if trace.terminated {
            palette.paint("✓ hit (last match)", ansi::YELLOW)
        } else if trace.hit {
            palette.paint("✓ hit", ansi::GREEN)
        } else {
            palette.dim("✗ miss")
        };
        println!("  {} {}", palette.paint(&trace.rule, ansi::BLUE), status);
    }
    if verbose.details.traces.is_empty() {
        println!("  {}", palette.dim("No action rules configured"));
    }

    println!("\n{}", palette.paint("━━━ Verdict ━━━", ansi::GRAY));
    if res.verdict.is_empty() {
        println!("  {}", palette.dim("Empty verdict (no rule hit)"));
    }
    for (key, value) in &res.verdict {
        println!(
            "  {} {} {}",
            palette.paint(key, ansi::CYAN),
            palette.dim("="),
            palette.bold(palette.paint(fmt_value(value), ansi::GREEN)),
        );
    }

    if !res.labels.is_empty() {
        println!("\n{}", palette.paint("━━━ Labels ━━━", ansi::GRAY));
        for (key, value) in &res.labels {
            println!("  {} {} {}", palette.paint(key, ansi::BLUE), palette.dim("="), value);
        }
    }
    if !res.attributes.is_empty() {
        println!("\n{}", palette.paint("━━━ Attributes ━━━", ansi::GRAY));
        for (key, value) in &res.attributes {
            println!("  {} {} {}", palette.paint(key, ansi::BLUE), palette.dim("="), value);
        }
    }
    if let Some(locked) = &res.locked_folder {
        println!("\n  {} {}", palette.dim("locked folder:"), palette.paint(locked, ansi::YELLOW));
    }

    let metrics = &verbose.details.metrics;
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Labels: {}  │  Evaluate: {}  │  Outcomes: {}",
        palette.paint(format!("{:?}", metrics.total), ansi::GREEN),
        palette.dim(format!("{:?}", metrics.labels)),
        palette.paint(format!("{:?}", metrics.evaluate), ansi::CYAN),
        palette.dim(format!("{:?}", metrics.outcomes)),
    );
}

pub fn print_pools(pools: &[FolderPool], color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.paint("━━━ Pools ━━━", ansi::GRAY));
    if pools.is_empty() {
        println!("  {}", palette.dim("No pools configured"));
    }
    for pool in pools {
        let seats = format!("{}/{}", pool.seats_taken, pool.capacity);
        let seats = if pool.seats_taken >= pool.capacity {
            palette.paint(seats, ansi::YELLOW)
        } else {
            palette.paint(seats, ansi::GREEN)
        };
        let state = if pool.enabled { String::new() } else { palette.dim("  (disabled)") };
        println!("  {} {}{}", palette.paint(&pool.name, ansi::BLUE), seats, state);
    }
    println!();
}

fn fmt_value(value: &VerdictValue) -> String {
    match value {
        VerdictValue::Bool(b) => b.to_string(),
        VerdictValue::Str(s) => s.clone(),
        VerdictValue::Map(map) => {
            let entries: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}
