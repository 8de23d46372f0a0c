use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::sqlite::{Database, Distribution, NewResume, Resume};
use crate::embeddings::OllamaClient;
use crate::indexer::Indexer;
use crate::search::{SearchEngine, SearchFilters, SearchOptions};

/// A JSON file may hold one resume or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum ResumeFile {
    Many(Vec<NewResume>),
    One(NewResume),
}

/// Store resumes from a JSON file, embedding each one
#[inline]
pub async fn add_resumes(path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read resume file: {}", path.display()))?;
    let resumes = match serde_json::from_str::<ResumeFile>(&content)
        .with_context(|| format!("Failed to parse resume file: {}", path.display()))?
    {
        ResumeFile::Many(resumes) => resumes,
        ResumeFile::One(resume) => vec![resume],
    };

    let config = Config::load_default()?;
    let indexer = Indexer::from_config(&config).await?;

    info!("Adding {} resumes from {}", resumes.len(), path.display());

    let mut unindexed = 0;
    for resume in &resumes {
        let outcome = indexer.upsert(resume).await?;
        if outcome.indexed {
            println!("✓ {} (ID: {})", resume.name, outcome.id);
        } else {
            unindexed += 1;
            println!(
                "{} {} (ID: {}) stored without embedding",
                style("⚠").yellow(),
                resume.name,
                outcome.id
            );
        }
    }

    if unindexed > 0 {
        println!();
        println!(
            "{} resumes are waiting for an embedding. Run 'talent-search repair' once the embedding service is reachable.",
            unindexed
        );
    }

    Ok(())
}

async fn open_database() -> Result<(Config, Database)> {
    let config = Config::load_default()?;
    let database = Database::initialize_from_config_dir(config.get_base_dir())
        .await
        .context("Failed to initialize database")?;
    Ok((config, database))
}

fn index_marker(resume: &Resume, expected_dimension: usize) -> console::StyledObject<&'static str> {
    if resume.is_index_ready(expected_dimension) {
        style("indexed").green()
    } else {
        style("pending").yellow()
    }
}

/// List all stored resumes in insertion order
#[inline]
pub async fn list_resumes() -> Result<()> {
    let (config, database) = open_database().await?;
    let resumes = database.list_resumes().await.context("Failed to list resumes")?;

    if resumes.is_empty() {
        println!("No resumes have been added yet.");
        println!("Use 'talent-search add <file.json>' to add resumes.");
        return Ok(());
    }

    println!("Resumes ({} total):", resumes.len());
    println!();

    for resume in &resumes {
        println!(
            "👤 {} (ID: {}) [{}]",
            resume.name,
            resume.id,
            index_marker(resume, config.embedding_dimension())
        );
        if !resume.skills.is_empty() {
            println!("   Skills: {}", resume.skills.join(", "));
        }
        if let Some(location) = resume.location() {
            println!("   Location: {}", location);
        }
    }

    Ok(())
}

/// Print one resume in full
#[inline]
pub async fn show_resume(id: i64) -> Result<()> {
    let (config, database) = open_database().await?;
    let resume = database
        .get_resume(id)
        .await?
        .ok_or(crate::TalentError::NotFound(id))?;

    println!("{}", style(format!("👤 {}", resume.name)).bold().cyan());
    println!("   ID: {}", resume.id);
    println!(
        "   Index: {}",
        index_marker(&resume, config.embedding_dimension())
    );
    println!("   Skills: {}", resume.skills.join(", "));
    if let Some(experience) = &resume.experience {
        println!("   Experience: {}", experience);
    }
    if let Some(education) = &resume.education {
        println!("   Education: {}", education);
    }
    for (key, value) in &resume.contact {
        println!("   {}: {}", key, value);
    }
    if let Some(summary) = &resume.summary {
        println!("   Summary: {}", summary);
    }
    println!(
        "   Added: {}",
        resume.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "   Updated: {}",
        resume.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    Ok(())
}

/// Rank resumes against a recruiter query and print the analysis
#[inline]
pub async fn search(
    query: &str,
    top_k: Option<usize>,
    filters: SearchFilters,
    with_analysis: bool,
) -> Result<()> {
    let config = Config::load_default()?;
    let top_k = config.search.resolve_top_k(top_k)?;
    let engine = SearchEngine::from_config(&config).await?;

    let options = SearchOptions {
        top_k,
        filters,
        with_analysis,
    };
    let response = engine.search(query, &options).await?;

    if response.matches.is_empty() {
        println!("No matching resumes found.");
    } else {
        println!(
            "{}",
            style(format!("Top {} matches:", response.matches.len())).bold()
        );
        println!();
        for (rank, candidate) in response.matches.iter().enumerate() {
            println!(
                "{}. {} (ID: {}) score {:.3}",
                rank + 1,
                style(&candidate.name).cyan(),
                candidate.record_id,
                candidate.score
            );
            if !candidate.skills.is_empty() {
                println!("   Skills: {}", candidate.skills.join(", "));
            }
            if let Some(experience) = &candidate.experience {
                println!("   Experience: {}", experience);
            }
        }
    }

    if let Some(analysis) = response.analysis {
        println!();
        println!("{}", style("Analysis").bold().yellow());
        println!("{}", analysis);
    }

    Ok(())
}

/// Re-embed resumes that have no usable embedding
#[inline]
pub async fn repair() -> Result<()> {
    let config = Config::load_default()?;
    let verifier = Indexer::from_config(&config).await?.verifier();

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(0).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Repairing embeddings")
                .context("Invalid progress template")?,
        )
    } else {
        ProgressBar::hidden()
    };

    let repaired = verifier
        .repair_with_progress(|done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        })
        .await?;
    bar.finish_and_clear();

    println!("Repaired {} resumes", repaired);

    let report = verifier.verify().await?;
    if !report.is_consistent {
        println!(
            "{} {}",
            style("⚠").yellow(),
            report.summary()
        );
    }

    Ok(())
}

/// Report resumes without a usable embedding
#[inline]
pub async fn verify() -> Result<()> {
    let config = Config::load_default()?;
    let report = Indexer::from_config(&config).await?.verify().await?;

    if report.is_consistent {
        println!("✅ {}", report.summary());
    } else {
        println!("⚠️  {}", report.summary());
        if !report.missing_embeddings.is_empty() {
            println!("   Missing: {:?}", report.missing_embeddings);
        }
        if !report.malformed_embeddings.is_empty() {
            println!("   Malformed: {:?}", report.malformed_embeddings);
        }
        println!("   Run 'talent-search repair' to fix them.");
    }

    Ok(())
}

/// Delete every stored resume
#[inline]
pub async fn clear(skip_confirmation: bool) -> Result<()> {
    let config = Config::load_default()?;
    let indexer = Indexer::from_config(&config).await?;
    let count = indexer.database().count_resumes().await?;

    if count == 0 {
        println!("There are no resumes to delete.");
        return Ok(());
    }

    if !skip_confirmation
        && !Confirm::new()
            .with_prompt(format!(
                "Delete all {} resumes? This action cannot be undone.",
                count
            ))
            .default(false)
            .interact()?
    {
        println!("Aborted.");
        return Ok(());
    }

    let deleted = indexer.delete_all().await?;
    println!("✓ Deleted {} resumes", deleted);

    Ok(())
}

/// Show store, embedding service and index health
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default()?;

    println!("📊 Talent Search Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Database Status:");
    let database = match Database::initialize_from_config_dir(config.get_base_dir()).await {
        Ok(database) => {
            println!("   ✅ SQLite: Connected");
            println!("   📁 Path: {}", config.database_path().display());
            Some(database)
        }
        Err(e) => {
            println!("   ❌ SQLite: Failed to connect - {}", e);
            None
        }
    };

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match tokio::task::spawn_blocking(move || client.health_check()).await? {
            Ok(()) => {
                println!("   ✅ Ollama: Healthy");
                println!("   📋 Model: {}", config.ollama.model);
                println!(
                    "   🔢 Dimension: {}",
                    config.ollama.embedding_dimension
                );
            }
            Err(e) => println!("   ⚠️  Ollama: Unhealthy - {}", e),
        },
        Err(e) => println!("   ❌ Ollama: Failed to connect - {}", e),
    }

    println!();
    println!("🧠 Generation:");
    println!(
        "   {} via {}",
        config.generation.model, config.generation.provider
    );

    let Some(database) = database else {
        return Ok(());
    };

    println!();
    println!("👥 Candidates:");
    match database.statistics(config.embedding_dimension()).await {
        Ok(stats) => {
            println!("   Total: {}", stats.total_candidates);
            println!("   Indexed: {}", stats.indexed_candidates);
            println!("   Pending: {}", stats.pending_candidates);
            println!(
                "   Average Experience: {:.1} years",
                stats.average_experience
            );
            if let Some(skill) = &stats.top_skill {
                println!("   Top Skill: {}", skill);
            }
            if let Some(location) = &stats.top_location {
                println!("   Top Location: {}", location);
            }
            if !stats.skill_distribution.is_empty() {
                println!(
                    "   Skills: {}",
                    format_distribution(&stats.skill_distribution, "%")
                );
            }
            if !stats.location_distribution.is_empty() {
                println!(
                    "   Locations: {}",
                    format_distribution(&stats.location_distribution, "")
                );
            }
            if stats.pending_candidates > 0 {
                println!();
                println!("   Run 'talent-search repair' to index pending candidates.");
            }
        }
        Err(e) => {
            warn!("Failed to compute statistics: {}", e);
            println!("   ⚠️  Statistics unavailable - {}", e);
        }
    }

    Ok(())
}

/// One line such as `python 40%, sql 20%`, capped to the most frequent entries
fn format_distribution(entries: &[Distribution], unit: &str) -> String {
    const SHOWN: usize = 8;

    let mut parts: Vec<String> = entries
        .iter()
        .take(SHOWN)
        .map(|entry| format!("{} {}{}", entry.name, entry.value, unit))
        .collect();
    if entries.len() > SHOWN {
        parts.push(format!("+{} more", entries.len() - SHOWN));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, value: usize) -> Distribution {
        Distribution {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn distribution_line_keeps_order_and_unit() {
        let skills = [entry("python", 40), entry("sql", 20)];
        assert_eq!(format_distribution(&skills, "%"), "python 40%, sql 20%");

        let locations = [entry("Lisbon", 3), entry("Berlin", 1)];
        assert_eq!(format_distribution(&locations, ""), "Lisbon 3, Berlin 1");
    }

    #[test]
    fn long_distribution_is_capped() {
        let entries: Vec<Distribution> = (0..10).map(|i| entry(&format!("s{i}"), 10 - i)).collect();
        let line = format_distribution(&entries, "");
        assert!(line.starts_with("s0 10, s1 9"));
        assert!(line.ends_with("s7 3, +2 more"));
    }
}
