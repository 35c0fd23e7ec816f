use ayati_domain::config::Config;

#[test]
fn empty_toml_yields_built_in_defaults() {
    let cfg = Config::from_toml("").unwrap();
    assert_eq!(cfg.agent_loop.base_step_limit, 14);
    assert_eq!(cfg.agent_loop.max_step_limit, 30);
    assert_eq!(cfg.pulse.poll_interval_secs, 30);
}

#[test]
fn explicit_guardrail_section_overrides_only_named_fields() {
    let toml_str = r#"
[guardrail]
tool_mode = "allowlist"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.guardrail.tool_mode, ayati_domain::config::ToolMode::Allowlist);
    assert_eq!(config.guardrail.confirmation_token_prefix, "CONFIRM:");
}
