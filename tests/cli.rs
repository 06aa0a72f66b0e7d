//! CLI argument parsing and validation tests - no network I/O.
//!
//! These tests verify that invalid arguments are rejected before any cassette
//! or live adapter is consulted.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("imagen-studio");
    cmd.env("IMAGEN_STUDIO_CONFIG", "/nonexistent/imagen-studio.toml")
        .env("IMAGEN_STUDIO_REPLAY", "/nonexistent/unused.yaml");
    cmd
}

#[test]
fn missing_prompt_exits_with_error() {
    cmd()
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Provide a prompt string"));
}

#[test]
fn blank_prompt_exits_with_error() {
    cmd()
        .args(["generate", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Prompt is empty"));
}

#[test]
fn invalid_model_exits_with_error() {
    cmd()
        .args(["generate", "--model", "dall-e-3", "a cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown model 'dall-e-3'"));
}

#[test]
fn invalid_aspect_ratio_exits_with_error() {
    cmd()
        .args(["generate", "--model", "nano-banana"])
        .args(["--aspect-ratio", "100:200", "a cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported aspect ratio"));
}

#[test]
fn invalid_size_exits_with_error() {
    cmd()
        .args(["generate", "--size", "8K", "a cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported size"));
}

#[test]
fn missing_reference_file_exits_with_error() {
    cmd()
        .args(["generate", "-r", "/nonexistent/ref.png", "a cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}

#[test]
fn unsupported_upscale_factor_exits_with_error() {
    cmd()
        .args(["upscale", "--input", "/nonexistent/in.png"])
        .args(["--factor", "x3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot upscale: Unsupported upscale factor 'x3'"));
}

#[test]
fn missing_subcommand_shows_usage() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
