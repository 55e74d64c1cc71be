use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::chart::{Bar, render_barh};
use crate::cli::AnalyzeArgs;
use crate::export::{create_output, csv_writer, load_table};
use crate::formats::{CATEGORY_LEVELS, COLUMNS, TableRow};

pub const TOP_DISCOUNTED: usize = 5;

/// Files written by [`run`] into the output directory.
pub const OUTPUTS: [&str; 7] = [
    "category_counts_2level.csv",
    "category_counts_3level.csv",
    "category_counts_4level.csv",
    "discount_top5.csv",
    "discount_by_category.csv",
    "top5_category_distribution.svg",
    "discount_by_category.svg",
];

/// A loaded row plus its derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedRow {
    pub row: TableRow,
    /// `None` when the original price is unavailable.
    pub discount: Option<f64>,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub categories: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDiscount {
    pub category: String,
    pub mean_discount: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    pub rows: usize,
    pub missing_price_original: usize,
    pub missing_categories: usize,
}

pub fn discount_ratio(price_special: u32, price_original: Option<u32>) -> Option<f64> {
    let original = price_original.filter(|p| *p > 0)?;
    Some(1.0 - f64::from(price_special) / f64::from(original))
}

pub fn derive(rows: Vec<TableRow>) -> Vec<AnalyzedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| AnalyzedRow {
            discount: discount_ratio(row.price_special, row.price_original),
            rank: idx + 1,
            row,
        })
        .collect()
}

pub fn overview(rows: &[AnalyzedRow]) -> Overview {
    Overview {
        rows: rows.len(),
        missing_price_original: rows
            .iter()
            .filter(|r| r.row.price_original.is_none())
            .count(),
        missing_categories: rows
            .iter()
            .filter(|r| r.row.category_path().is_none())
            .count(),
    }
}

/// Row counts per category prefix of length `depth`, which must be in 1..=4.
///
/// The level-1 view is ordered by category; deeper views by count descending,
/// ties in category order. Rows without a category path are not counted.
///
/// # Panics
///
/// Panics if `depth` is outside 1..=4.
pub fn category_counts(rows: &[AnalyzedRow], depth: usize) -> Vec<CategoryCount> {
    assert!(
        (1..=CATEGORY_LEVELS).contains(&depth),
        "category depth must be 1..={CATEGORY_LEVELS}, got {depth}"
    );
    let mut groups: BTreeMap<Vec<&str>, usize> = BTreeMap::new();
    for row in rows {
        if let Some(path) = row.row.category_path() {
            *groups.entry(path[..depth].to_vec()).or_default() += 1;
        }
    }

    let mut counts: Vec<CategoryCount> = groups
        .into_iter()
        .map(|(categories, count)| CategoryCount {
            categories: categories.into_iter().map(str::to_owned).collect(),
            count,
        })
        .collect();
    if depth > 1 {
        counts.sort_by(|a, b| b.count.cmp(&a.count));
    }
    counts
}

/// Mean discount per level-2 category, highest first. Rows with an
/// unavailable discount are left out of the mean.
pub fn mean_discount_by_level2(rows: &[AnalyzedRow]) -> Vec<CategoryDiscount> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let (Some(category), Some(discount)) = (row.row.category_2.as_deref(), row.discount) else {
            continue;
        };
        let entry = groups.entry(category).or_insert((0.0, 0));
        entry.0 += discount;
        entry.1 += 1;
    }

    let mut means: Vec<CategoryDiscount> = groups
        .into_iter()
        .map(|(category, (sum, samples))| CategoryDiscount {
            category: category.to_owned(),
            mean_discount: sum / samples as f64,
            samples,
        })
        .collect();
    means.sort_by(|a, b| b.mean_discount.total_cmp(&a.mean_discount));
    means
}

/// The `n` most discounted rows. The sort is stable, so equal discounts keep
/// their original row order.
pub fn top_discounted(rows: &[AnalyzedRow], n: usize) -> Vec<&AnalyzedRow> {
    let mut ranked: Vec<&AnalyzedRow> = rows.iter().filter(|r| r.discount.is_some()).collect();
    ranked.sort_by(|a, b| match (a.discount, b.discount) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        _ => Ordering::Equal,
    });
    ranked.truncate(n);
    ranked
}

/// Level-2 category counts among `rows`, most frequent first.
pub fn level2_distribution(rows: &[&AnalyzedRow]) -> Vec<(String, usize)> {
    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        if let Some(category) = row.row.category_2.as_deref() {
            *groups.entry(category).or_default() += 1;
        }
    }
    let mut out: Vec<(String, usize)> = groups
        .into_iter()
        .map(|(category, count)| (category.to_owned(), count))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let input = PathBuf::from(&args.input);
    let out_dir = PathBuf::from(&args.out);

    let rows = derive(load_table(&input).context("load book table")?);
    if rows.is_empty() {
        anyhow::bail!("book table is empty: {}", input.display());
    }
    if !args.force {
        ensure_outputs_do_not_exist(&out_dir)?;
    }
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create analysis dir: {}", out_dir.display()))?;

    let info = overview(&rows);
    tracing::info!(
        rows = info.rows,
        missing_price_original = info.missing_price_original,
        missing_categories = info.missing_categories,
        "dataset overview"
    );
    println!("Dataset Overview");
    println!("rows: {}", info.rows);
    println!("Price_original NA: {}", info.missing_price_original);
    println!("Category NA: {}", info.missing_categories);
    println!();

    println!("Category_1 counts");
    for count in category_counts(&rows, 1) {
        println!("{}\t{}", count.categories.join(" / "), count.count);
    }
    println!();

    for depth in 2..=CATEGORY_LEVELS {
        let path = out_dir.join(format!("category_counts_{depth}level.csv"));
        write_category_counts(&path, &category_counts(&rows, depth), depth, args.force)
            .with_context(|| format!("write {}", path.display()))?;
    }

    let top = top_discounted(&rows, TOP_DISCOUNTED);
    println!("Top{TOP_DISCOUNTED} Discounted Books");
    for row in &top {
        println!("{}\t{:.4}", row.row.name, row.discount.unwrap_or_default());
    }
    let top_path = out_dir.join("discount_top5.csv");
    write_top_discounted(&top_path, &top, args.force)
        .with_context(|| format!("write {}", top_path.display()))?;

    let distribution: Vec<Bar> = level2_distribution(&top)
        .into_iter()
        .map(|(category, count)| Bar::new(category, count as f64))
        .collect();
    write_svg(
        &out_dir.join("top5_category_distribution.svg"),
        &render_barh(
            "Category distribution for top 5 discounted books",
            "Books",
            &distribution,
            0,
        ),
        args.force,
    )?;

    let means = mean_discount_by_level2(&rows);
    let means_path = out_dir.join("discount_by_category.csv");
    write_mean_discounts(&means_path, &means, args.force)
        .with_context(|| format!("write {}", means_path.display()))?;

    let bars: Vec<Bar> = means
        .iter()
        .map(|m| Bar::new(m.category.clone(), m.mean_discount))
        .collect();
    write_svg(
        &out_dir.join("discount_by_category.svg"),
        &render_barh(
            &format!("Discount by category for top{} bestsellers", rows.len()),
            "Discount ratio",
            &bars,
            3,
        ),
        args.force,
    )?;

    tracing::info!(out = %out_dir.display(), "analysis written");
    Ok(())
}

fn ensure_outputs_do_not_exist(out_dir: &Path) -> anyhow::Result<()> {
    let existing: Vec<String> = OUTPUTS
        .iter()
        .map(|name| out_dir.join(name))
        .filter(|path| path.exists())
        .map(|path| path.display().to_string())
        .collect();
    if !existing.is_empty() {
        anyhow::bail!("analysis output already exists: {}", existing.join(", "));
    }
    Ok(())
}

const COUNT_HEADERS: [&str; CATEGORY_LEVELS] =
    ["Category_1", "Category_2", "Category_3", "Category_4"];

fn write_category_counts(
    path: &Path,
    counts: &[CategoryCount],
    depth: usize,
    force: bool,
) -> anyhow::Result<()> {
    let mut writer = csv_writer(path, force)?;
    let mut header: Vec<&str> = COUNT_HEADERS[..depth].to_vec();
    header.push("Counts");
    writer.write_record(&header)?;
    for count in counts {
        let mut record = count.categories.clone();
        record.push(count.count.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_top_discounted(path: &Path, rows: &[&AnalyzedRow], force: bool) -> anyhow::Result<()> {
    let mut writer = csv_writer(path, force)?;
    let mut header: Vec<&str> = COLUMNS.to_vec();
    header.extend(["Discount", "Rank"]);
    writer.write_record(&header)?;
    for analyzed in rows {
        let row = &analyzed.row;
        writer.write_record([
            row.name.clone(),
            row.author.clone(),
            row.category_1.clone().unwrap_or_default(),
            row.category_2.clone().unwrap_or_default(),
            row.category_3.clone().unwrap_or_default(),
            row.category_4.clone().unwrap_or_default(),
            row.price_original
                .map_or_else(|| "NA".to_owned(), |p| p.to_string()),
            row.price_special.to_string(),
            analyzed
                .discount
                .map_or_else(|| "NA".to_owned(), |d| format!("{d:.6}")),
            analyzed.rank.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_mean_discounts(path: &Path, means: &[CategoryDiscount], force: bool) -> anyhow::Result<()> {
    let mut writer = csv_writer(path, force)?;
    writer.write_record(["Category_2", "Discount", "Samples"])?;
    for mean in means {
        writer.write_record([
            mean.category.clone(),
            format!("{:.6}", mean.mean_discount),
            mean.samples.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_svg(path: &Path, svg: &str, force: bool) -> anyhow::Result<()> {
    use std::io::Write as _;

    let mut file = create_output(path, force)?;
    file.write_all(svg.as_bytes())
        .with_context(|| format!("write chart: {}", path.display()))?;
    Ok(())
}
