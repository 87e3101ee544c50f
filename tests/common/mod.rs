use psatd_rs::sim::Sim;
use psatd_rs::Config;

pub fn setup_cfg() -> Config {
    // A small vacuum box with pure spectral stencils, so a plane wave is an
    // exact eigenmode with omega = c |k|.
    Config::from_toml(
        r#"
[params]
size_x = 32
size_y = 16
delta_x = 0.5
delta_y = 0.5
dt = 0.3
c = 1.0
ep0 = 1.0
norder_x = -1
norder_y = -1
grid_type = "collocated"

[setup]
t_final = 20
mode_x = 2
mode_y = 1
amplitude = 1.5

[output]
write_output = false
output_interval = 10
stride = 1
"#,
    )
    .unwrap()
}

pub fn setup_sim(cfg: &Config) -> Sim {
    let mut sim = Sim::new(cfg).unwrap();
    sim.init_plane_wave(
        cfg.setup.mode_x,
        cfg.setup.mode_y,
        cfg.setup.amplitude,
        cfg.setup.noise,
    )
    .unwrap();
    sim
}
