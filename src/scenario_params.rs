use sim_recorder::params::SimulationParams;

pub fn get_scenario_params() -> SimulationParams {
    let params_yaml_str = r#"
clock:
  tick_dts:
  - tick: 8
    dt: 0.0001
  - tick: 18
    dt: 0.01
recorders:
- path: /model/soma[0]/Vm
  kind: Electrical
  tick: null
  params:
    use_streamer: false
- path: /model/soma[0]/spikes
  kind: Electrical
  tick: null
  params:
    use_spike_mode: true
    threshold: -0.02
- path: /model/dend[0]/Ca
  kind: Biochemical
  tick: null
  params:
    column_name: ca_conc
"#;

    serde_yaml::from_str(params_yaml_str).unwrap()
}
