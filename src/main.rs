use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use cyber_container::{
    Config, ExportClient, ExportController, IsometricCamera, RenderPipeline, RenderTargetState,
    Scene, SceneAssembler,
};

mod renderer;
mod ui;

use renderer::GpuState;
use ui::{StatusKind, UiState, ViewStats, apply_theme, draw_side_panel};

#[derive(Parser, Debug)]
#[command(version, about = "Isometric cyber container viewer and PNG exporter")]
struct Args {
    /// JSON config file; every field is optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Export one SIZE x SIZE PNG without opening a window, then exit.
    #[arg(long, value_name = "SIZE")]
    export: Option<u32>,

    /// Basename (or full `.png` name) for `--export`.
    #[arg(long, value_name = "BASENAME", requires = "export")]
    name: Option<String>,
}

/// Builds the scene, the render target and the export controller shared by both modes.
fn build_core(
    config: &Config,
    width: u32,
    height: u32,
) -> Result<(Scene, RenderPipeline, ExportController)> {
    let scene = SceneAssembler::new(config.scene.clone())
        .assemble()
        .context("failed to assemble scene")?;
    let pipeline = RenderPipeline::new(
        config.pipeline_settings(),
        RenderTargetState::new(width, height),
    )
    .context("failed to create render pipeline")?;
    let controller = ExportController::new(config.camera.projector, config.camera.zoom_scale)
        .context("invalid export camera")?
        .with_default_basename(config.export.default_basename.clone());
    Ok((scene, pipeline, controller))
}

/// `--export`: the same request/poll protocol the viewer uses, against an offscreen target.
fn run_headless(config: &Config, args: &Args, size: u32) -> Result<()> {
    let (scene, mut pipeline, mut controller) = build_core(config, args.width, args.height)?;
    let client = controller.client();

    client.request_export(size, args.name.clone())?;
    controller.poll(&mut pipeline, &scene, 0.0);

    let Some(outcome) = client.try_outcome() else {
        bail!("export request was not processed");
    };
    let image = outcome.result?;
    let path = image
        .save(&config.export.output_dir)
        .with_context(|| format!("failed to write {}", image.filename))?;
    info!("wrote {} ({}x{})", path.display(), image.width, image.height);
    Ok(())
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    config: Config,
    initial_size: (u32, u32),
    scene: Scene,
    pipeline: RenderPipeline,
    camera: IsometricCamera,
    exporter: ExportController,
    client: ExportClient,
    ui_state: UiState,

    start: Instant,
    frame_count: u32,
    fps_timer: Instant,
    fps: f32,
    render_ms: f32,
    last_vsync_state: bool,
}

impl App {
    fn new(config: Config, width: u32, height: u32) -> Result<Self> {
        let (scene, pipeline, exporter) = build_core(&config, width, height)?;
        let camera = IsometricCamera::new(
            config.camera.projector,
            config.camera.zoom_scale,
            width,
            height,
        )
        .context("invalid camera")?;
        let client = exporter.client();
        let ui_state = UiState::new(
            config.export.presets.clone(),
            &config.export.default_basename,
        );

        Ok(Self {
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            config,
            initial_size: (width, height),
            scene,
            pipeline,
            camera,
            exporter,
            client,
            last_vsync_state: !ui_state.vsync_enabled,
            ui_state,

            start: Instant::now(),
            frame_count: 0,
            fps_timer: Instant::now(),
            fps: 0.0,
            render_ms: 0.0,
        })
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let gpu = pollster::block_on(GpuState::new(window.clone(), self.scene.background()))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        self.window = Some(window.clone());
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);

        self.resize_target(window.inner_size(), window.scale_factor());
        Ok(())
    }

    /// Follows the window: logical size plus the device pixel ratio.
    fn resize_target(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let logical = size.to_logical::<f64>(scale_factor);
        let state = RenderTargetState {
            width: (logical.width.round() as u32).max(1),
            height: (logical.height.round() as u32).max(1),
            pixel_density: scale_factor as f32,
        };
        if let Err(e) = self.pipeline.apply_state(state) {
            warn!("could not resize render target to {state:?}: {e}");
        }
        if let Err(e) = self.camera.set_viewport(size.width, size.height) {
            warn!("camera kept previous frustum: {e}");
        }
    }

    fn update(&mut self) {
        self.frame_count += 1;
        if self.fps_timer.elapsed().as_secs_f32() >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer.elapsed().as_secs_f32();
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }

        // exports run here, between frames, so no interactive frame sees the export size
        let time = self.start.elapsed().as_secs_f32();
        self.exporter.poll(&mut self.pipeline, &self.scene, time);

        while let Some(outcome) = self.client.try_outcome() {
            match outcome.result {
                Ok(image) => match image.save(&self.config.export.output_dir) {
                    Ok(path) => self
                        .ui_state
                        .set_status(StatusKind::Info, format!("Saved {}", path.display())),
                    Err(e) => {
                        error!("failed to write {}: {e}", image.filename);
                        self.ui_state
                            .set_status(StatusKind::Error, format!("Write failed: {e}"));
                    }
                },
                Err(e) => self
                    .ui_state
                    .set_status(StatusKind::Error, format!("Export failed: {e}")),
            }
        }

        let started = Instant::now();
        match self
            .pipeline
            .render(&self.scene, self.camera.frame(), time)
        {
            Ok(()) => {
                if let (Some(gpu), Some(rgba)) = (&mut self.gpu, self.pipeline.frame_rgba()) {
                    gpu.upload_frame(self.pipeline.physical_size(), rgba);
                }
            }
            Err(e) => warn!("frame skipped: {e}"),
        }
        self.render_ms = started.elapsed().as_secs_f32() * 1000.0;
    }

    fn render(&mut self) {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);

        let stats = ViewStats {
            fps: self.fps,
            render_ms: self.render_ms,
            physical_size: self.pipeline.physical_size(),
            allocations: self.pipeline.allocation_count(),
        };
        let phase = self.client.phase();
        let busy = self.client.is_busy();

        let mut ui_actions = ui::UiActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, &mut self.ui_state, &stats, phase, busy);
        });

        if let Some(action) = ui_actions.export {
            match self.client.request_export(action.target_size, action.filename) {
                Ok(()) => self.ui_state.set_status(
                    StatusKind::Info,
                    format!("Exporting {0}x{0}...", action.target_size),
                ),
                Err(e) => self.ui_state.set_status(StatusKind::Error, e.to_string()),
            }
        }

        let Some(gpu) = &mut self.gpu else { return };
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if self.ui_state.vsync_enabled != self.last_vsync_state {
            gpu.set_vsync(self.ui_state.vsync_enabled);
            self.last_vsync_state = self.ui_state.vsync_enabled;
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(e @ (wgpu::SurfaceError::OutOfMemory | wgpu::SurfaceError::Timeout)) => {
                warn!("surface unavailable: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_frame(&view, &mut encoder);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let (width, height) = self.initial_size;
        let window_attrs = Window::default_attributes()
            .with_title("Cyber Container")
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        if let Err(e) = self.init_gpu(window) {
            error!("failed to initialise GPU: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                }
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                self.resize_target(size, scale);
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize_target(size, scale_factor);
                }
            }

            WindowEvent::RedrawRequested => {
                self.update();
                self.render();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("failed to load config")?;

    if let Some(size) = args.export {
        let started = Instant::now();
        run_headless(&config, &args, size)?;
        info!("export finished in {:.2?}", started.elapsed());
        return Ok(());
    }

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::WaitUntil(
        Instant::now() + Duration::from_millis(16),
    ));

    let mut app = App::new(config, args.width, args.height)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
