use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fibonacci_trust::{
    count_events, extension_levels, insert_event, load_activity_csv, load_all_generative_units,
    load_all_identities, retracement_levels, save_generative_unit, save_identity,
    setup_database, ActivityReplay, BadgeRegistry, CatalogEntry, EngineConfig, Event,
    ResourceLedger, SecurityIdentityEngine, VERSION,
};

const USAGE: &str = "\
Usage:
  fibonacci-trust replay <activity.csv>   Replay activity into the SQLite store
  fibonacci-trust catalog                 List badges and certifications
  fibonacci-trust levels <high> <low>     Print retracement and extension levels";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = EngineConfig::from_env()?;
    init_logging(&config);

    match args.get(1).map(String::as_str) {
        Some("replay") => {
            let csv_path = args.get(2).ok_or_else(|| anyhow!("replay needs a CSV path\n{}", USAGE))?;
            run_replay(&config, Path::new(csv_path))
        }
        Some("catalog") => {
            run_catalog();
            Ok(())
        }
        Some("levels") => {
            let high = parse_arg(&args, 2, "high")?;
            let low = parse_arg(&args, 3, "low")?;
            run_levels(high, low)
        }
        _ => {
            eprintln!("fibonacci-trust {}\n\n{}", VERSION, USAGE);
            std::process::exit(1);
        }
    }
}

fn init_logging(config: &EngineConfig) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_arg(args: &[String], index: usize, name: &str) -> Result<f64> {
    args.get(index)
        .ok_or_else(|| anyhow!("missing <{}>\n{}", name, USAGE))?
        .parse()
        .with_context(|| format!("Invalid <{}> value", name))
}

fn run_replay(config: &EngineConfig, csv_path: &Path) -> Result<()> {
    println!("🪙 Fibonacci Trust - Activity Replay");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading activity...");
    let rows = load_activity_csv(csv_path)?;
    println!("✓ Loaded {} rows from {}", rows.len(), csv_path.display());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = Connection::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode ({})", config.database.path);

    // 3. Restore previous state
    let mut ledger = ResourceLedger::new();
    for unit in load_all_generative_units(&conn)? {
        ledger.restore(unit);
    }
    let mut engine = SecurityIdentityEngine::new();
    for identity in load_all_identities(&conn)? {
        engine.restore(identity);
    }
    println!(
        "✓ Restored {} units, {} identities",
        ledger.count(),
        engine.count()
    );

    // 4. Replay
    println!("\n⚙️  Replaying activity...");
    let mut replay = ActivityReplay::with_state(
        ledger,
        engine,
        config.ledger.default_allocation,
        config.cache.ttl_secs,
    );
    let summary = replay.replay(&rows);

    for outcome in &summary.outcomes {
        for alert in &outcome.alerts {
            println!("   {} {}", outcome.entity_id, alert.summary());
        }
    }
    for rejected in &summary.rejected {
        println!("   ✗ row {} ({}): {}", rejected.row, rejected.entity_id, rejected.reason);
    }

    // 5. Persist snapshots and audit events
    println!("\n💾 Saving snapshots...");
    let mut written = 0;
    for unit in replay.ledger.all_units() {
        if save_generative_unit(&conn, unit)? {
            written += 1;
        }
    }
    for identity in replay.engine.all_identities() {
        if save_identity(&conn, identity)? {
            written += 1;
        }
    }
    println!("✓ Snapshots written: {} (unchanged skipped)", written);

    for outcome in &summary.outcomes {
        let event_type = if outcome.blocked {
            "consumption_blocked".to_string()
        } else {
            format!("{}_applied", outcome.kind)
        };
        let event = Event::new(
            &event_type,
            outcome.record_kind,
            &outcome.record_id,
            outcome.data.clone(),
            "activity_replay",
        );
        insert_event(&conn, &event)?;
    }
    println!("✓ Event log holds {} events", count_events(&conn)?);

    // 6. Summary
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Rows applied:         {}", summary.rows_applied);
    println!("🚫 Blocked consumptions: {}", summary.blocked_consumptions);
    println!("🔔 Alerts emitted:       {}", summary.alerts_emitted);
    println!("🆕 Units created:        {}", summary.units_created);
    println!("🆕 Identities created:   {}", summary.identities_created);
    if !summary.rejected.is_empty() {
        println!("⚠️  Rows rejected:        {}", summary.rejected.len());
    }

    println!("\n🛡️  Identities:");
    for identity in replay.engine.all_identities() {
        println!(
            "   {:<16} {:<10} score {:>6.2}  trust {:>5.1}%  risk {:>5.1}%",
            identity.entity_id,
            identity.security_level.as_str(),
            identity.fibonacci_score,
            identity.trust_score,
            identity.risk_profile.overall_risk * 100.0
        );
    }

    println!("\n🪙 Generative units:");
    for unit in replay.ledger.all_units() {
        println!(
            "   {:<16} {:<10} {:>6}/{:<6} remaining  fib {:>4}  progress {:>5.1}%{}",
            unit.entity_id,
            unit.pathway.as_str(),
            unit.remaining_units,
            unit.allocated_units,
            unit.fibonacci_level,
            unit.overall_progress * 100.0,
            if unit.is_locked() { "  🔒" } else { "" }
        );
    }

    Ok(())
}

fn run_catalog() {
    println!("🏅 Badge & Certification Catalog");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for entry in BadgeRegistry::list_available() {
        match entry {
            CatalogEntry::Badge(badge) => println!(
                "   🏅 {:<32} {:<9} {} - {}",
                badge.name,
                badge.level.as_str(),
                badge.issuer,
                badge.description
            ),
            CatalogEntry::Certification(cert) => println!(
                "   📜 {:<32} {:<9} {} ({})",
                cert.name, "", cert.issuer, cert.standard
            ),
        }
    }
}

fn run_levels(high: f64, low: f64) -> Result<()> {
    if high < low {
        return Err(anyhow!("<high> must be >= <low> (got {} < {})", high, low));
    }

    println!("📐 Fibonacci levels {} → {}", high, low);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\nRetracement:");
    for level in retracement_levels(high, low) {
        println!("   {:>6.1}%  {:>12.4}", level.percent(), level.value);
    }

    println!("\nExtension:");
    for level in extension_levels(low, high) {
        println!("   {:>6.1}%  {:>12.4}", level.percent(), level.value);
    }

    Ok(())
}
