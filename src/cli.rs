use anyhow::{bail, Context, Result};
use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use baryastore::db::Database;
use baryastore::models::{
    format_centavos, Category, IncomeFrequency, Transaction, UserProfile, PROFILE_ID,
};

pub(crate) fn run(args: &[String], db: &Database) -> Result<()> {
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }
    match args[1].as_str() {
        "setup" => cmd_setup(&args[2..], db),
        "profile" => cmd_profile(db),
        "income" => cmd_income(&args[2..], db),
        "spend" => cmd_spend(&args[2..], db),
        "list" => cmd_list(&args[2..], db),
        "categories" => cmd_categories(db),
        "total" => cmd_total(&args[2..], db),
        "clear" => cmd_clear(&args[2..], db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("baryastore {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("BaryaStore: local persistence for the BaryaBuddy budget tracker");
    println!();
    println!("Usage: baryastore <command>");
    println!();
    println!("Commands:");
    println!("  setup --income <amount>       Create or replace the user profile");
    println!("    --bills <amount>            Fixed bills (default 0)");
    println!("    --savings <amount>          Savings goal (default 0)");
    println!("    --frequency <f>             weekly | monthly | irregular (default monthly)");
    println!("    --reset-day <1-31>          Day the budget cycle resets (default 1)");
    println!("    --currency <symbol>         Currency symbol (default ₱)");
    println!("  profile                       Show the user profile");
    println!("  income <amount> [note]        Record income");
    println!("  spend <amount> <category> [note]  Record an expense");
    println!("  list [YYYY-MM] [--limit N]    List transactions");
    println!("  categories                    List categories");
    println!("  total [YYYY-MM]               Month total (default: current month)");
    println!("  clear --yes                   Delete every transaction");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

// ── Commands ─────────────────────────────────────────────────

fn cmd_setup(args: &[String], db: &Database) -> Result<()> {
    let income = parse_amount(
        flag_value(args, "--income")
            .context("Usage: baryastore setup --income <amount> [--bills <amount>] ...")?,
    )?;
    let bills = match flag_value(args, "--bills") {
        Some(v) => parse_amount(v)?,
        None => 0,
    };
    let savings = match flag_value(args, "--savings") {
        Some(v) => parse_amount(v)?,
        None => 0,
    };
    let frequency = match flag_value(args, "--frequency") {
        Some(v) => IncomeFrequency::parse(&v.to_uppercase())
            .with_context(|| format!("Unknown frequency: {v}"))?,
        None => IncomeFrequency::Monthly,
    };
    let reset_day: u32 = match flag_value(args, "--reset-day") {
        Some(v) => v.parse().with_context(|| format!("Invalid reset day: {v}"))?,
        None => 1,
    };
    if !(1..=31).contains(&reset_day) {
        bail!("Reset day must be between 1 and 31");
    }
    let currency = flag_value(args, "--currency").unwrap_or("₱").to_string();

    db.insert_profile(&UserProfile {
        id: PROFILE_ID,
        income_amount: income,
        fixed_bills_amount: bills,
        savings_goal_amount: savings,
        income_frequency: frequency,
        reset_day,
        currency,
        setup_completed: true,
    })?;
    println!("Profile saved.");
    Ok(())
}

fn cmd_profile(db: &Database) -> Result<()> {
    match db.get_profile_once()? {
        None => println!("No profile yet. Run: baryastore setup --income <amount>"),
        Some(p) => {
            println!("Income:       {} ({})", format_centavos(p.income_amount, &p.currency), p.income_frequency);
            println!("Fixed bills:  {}", format_centavos(p.fixed_bills_amount, &p.currency));
            println!("Savings goal: {}", format_centavos(p.savings_goal_amount, &p.currency));
            println!("Reset day:    {}", p.reset_day);
            println!("Setup done:   {}", p.setup_completed);
        }
    }
    Ok(())
}

fn cmd_income(args: &[String], db: &Database) -> Result<()> {
    if args.is_empty() {
        bail!("Usage: baryastore income <amount> [note]");
    }
    let amount = parse_amount(&args[0])?;
    let note = join_note(&args[1..]);
    let id = db.insert_transaction(&Transaction::new(amount, None, note))?;
    let currency = currency_of(db)?;
    println!("Recorded income {} (id {id})", format_centavos(amount, &currency));
    Ok(())
}

fn cmd_spend(args: &[String], db: &Database) -> Result<()> {
    if args.len() < 2 {
        bail!("Usage: baryastore spend <amount> <category> [note]");
    }
    let amount = parse_amount(&args[0])?;
    let category_id: i64 = args[1]
        .parse()
        .with_context(|| format!("Invalid category id: {}", args[1]))?;
    let category = db
        .get_category_by_id(category_id)?
        .with_context(|| format!("No category with id {category_id}"))?;
    let note = join_note(&args[2..]);
    let id = db.insert_transaction(&Transaction::new(amount, Some(category_id), note))?;
    let currency = currency_of(db)?;
    println!(
        "Recorded {} on {} (id {id})",
        format_centavos(amount, &currency),
        category.name
    );
    Ok(())
}

fn cmd_list(args: &[String], db: &Database) -> Result<()> {
    let month = args.first().filter(|a| !a.starts_with("--"));
    let limit: Option<u32> = match flag_value(args, "--limit") {
        Some(v) => Some(v.parse().with_context(|| format!("Invalid limit: {v}"))?),
        None => None,
    };

    let txns = if let Some(m) = month {
        let (year, month) = parse_month(m)?;
        db.get_transactions_for_month(year, month)?
    } else if let Some(l) = limit {
        db.get_recent_transactions(l)?
    } else {
        db.get_transactions()?
    };

    if txns.is_empty() {
        println!("No transactions.");
        return Ok(());
    }

    let currency = currency_of(db)?;
    let categories = db.get_categories()?;
    for txn in &txns {
        let label = match txn.category_id {
            None => "income".to_string(),
            Some(id) => Category::find_by_id(&categories, id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("category {id}")),
        };
        println!(
            "{:>5}  {}  {:>12}  {:<16} {}",
            txn.id.unwrap_or_default(),
            txn.date.format("%Y-%m-%d"),
            format_centavos(txn.amount_centavos, &currency),
            label,
            txn.description.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

fn cmd_categories(db: &Database) -> Result<()> {
    for cat in db.get_categories()? {
        println!(
            "{:>3}  {:<16} {:<14} #{:08X}",
            cat.id.unwrap_or_default(),
            cat.name,
            cat.icon,
            cat.color
        );
    }
    Ok(())
}

fn cmd_total(args: &[String], db: &Database) -> Result<()> {
    let (year, month) = match args.first() {
        Some(m) => parse_month(m)?,
        None => {
            let now = chrono::Utc::now();
            (now.year(), now.month())
        }
    };
    let total = db.total_for_month(year, month)?;
    let currency = currency_of(db)?;
    println!("{year}-{month:02}: {}", format_centavos(total, &currency));
    Ok(())
}

fn cmd_clear(args: &[String], db: &Database) -> Result<()> {
    if !args.iter().any(|a| a == "--yes") {
        bail!("This deletes every transaction. Re-run with --yes to confirm.");
    }
    db.clear_transactions()?;
    println!("All transactions deleted.");
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn join_note(args: &[String]) -> Option<String> {
    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}

fn currency_of(db: &Database) -> Result<String> {
    Ok(db
        .get_profile_once()?
        .map(|p| p.currency)
        .unwrap_or_else(|| "₱".to_string()))
}

/// Parse a user-entered decimal amount into exact minor units.
pub(crate) fn parse_amount(raw: &str) -> Result<i64> {
    let amount = Decimal::from_str(raw).with_context(|| format!("Invalid amount: {raw}"))?;
    if amount.is_sign_negative() {
        bail!("Amount must not be negative: {raw}");
    }
    let centavos = amount * Decimal::ONE_HUNDRED;
    if !centavos.fract().is_zero() {
        bail!("Amounts have at most two decimal places: {raw}");
    }
    centavos
        .to_i64()
        .with_context(|| format!("Amount out of range: {raw}"))
}

/// Parse `YYYY-MM` into (year, month).
pub(crate) fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let (y, m) = raw
        .split_once('-')
        .with_context(|| format!("Expected YYYY-MM, got: {raw}"))?;
    let year: i32 = y.parse().with_context(|| format!("Invalid year: {y}"))?;
    let month: u32 = m.parse().with_context(|| format!("Invalid month: {m}"))?;
    if !(1..=12).contains(&month) {
        bail!("Month must be between 1 and 12: {raw}");
    }
    Ok((year, month))
}
