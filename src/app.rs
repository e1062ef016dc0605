//! Application event loop.
//!
//! [`run`] opens a window, creates the wgpu [`Context`] and reads the
//! bootstrap manifest. Every asset the manifest names is then loaded in the
//! background; a finished load comes back to the event loop as an
//! [`AssetEvent`] and only registers resources. Drawing happens on
//! `RedrawRequested` alone.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the context
//! 2. the bootstrap manifest is fetched, then shaders, objects and images
//! 3. every frame the camera controller moves the camera and, once the active
//!    shader is loaded, the renderer draws the scene
//! 4. if the renderer is not ready before the configured deadline the app exits

use std::{future::Future, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{CursorGrabMode, Window},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    camera::{Camera, CameraController, FocusState, KeyInputState, Projection},
    config::{BOOTSTRAP_FILE, Bootstrap, RendererSettings},
    context::Context,
    data_structures::instance::IDENTITY,
    error::ResourceError,
    readiness::{Readiness, ReadinessGate},
    renderer::Renderer,
    resources::{
        shader::{ShaderInfo, ShaderSource, load_shader_files},
        texture::{SheetInfo, image_stem, is_sheet, load_image, load_sheet_info, load_string},
    },
};

/// Results of background loads, delivered on the event-loop thread.
pub enum AssetEvent {
    #[allow(dead_code)]
    Initialized(Context),
    Bootstrap(Result<Bootstrap, ResourceError>),
    Shader {
        name: String,
        result: Result<(ShaderSource, ShaderInfo), ResourceError>,
    },
    Object {
        file: String,
        result: Result<String, ResourceError>,
    },
    MaterialLibrary {
        file: String,
        result: Result<String, ResourceError>,
    },
    Image {
        name: String,
        result: Result<(image::RgbaImage, Option<SheetInfo>), ResourceError>,
    },
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AssetEvent>,
    renderer: Option<Renderer<Context>>,
    controller: Option<CameraController>,
    settings: RendererSettings,
    active_shader: Option<String>,
    gate: ReadinessGate,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<AssetEvent>) -> anyhow::Result<Self> {
        let settings = RendererSettings::default();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            renderer: None,
            controller: None,
            gate: ReadinessGate::new(settings.ready_timeout()),
            settings,
            active_shader: None,
            last_time: Instant::now(),
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn_load(&self, load: impl Future<Output = AssetEvent> + Send + 'static) {
        let proxy = self.proxy.clone();
        self.async_runtime.spawn(async move {
            if proxy.send_event(load.await).is_err() {
                log::warn!("Event loop closed before a load finished");
            }
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn_load(&self, load: impl Future<Output = AssetEvent> + 'static) {
        let proxy = self.proxy.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if proxy.send_event(load.await).is_err() {
                log::warn!("Event loop closed before a load finished");
            }
        });
    }

    fn on_context(&mut self, mut ctx: Context) {
        let window = ctx.window().clone();
        let size = window.inner_size();
        ctx.resize(size.width, size.height);

        let projection = Projection::new(
            size.width,
            size.height,
            cgmath::Deg(self.settings.fov_degrees),
            self.settings.znear,
            self.settings.zfar,
        );
        self.renderer = Some(Renderer::new(ctx, Camera::default(), projection));
        self.controller = Some(CameraController::new(
            KeyInputState::new(),
            FocusState::with_callback(move |focused| grab_cursor(&window, focused)),
            self.settings.camera_speed,
            self.settings.mouse_sensitivity,
        ));
        self.gate = ReadinessGate::new(self.settings.ready_timeout());

        self.spawn_load(async { AssetEvent::Bootstrap(load_bootstrap().await) });
    }

    fn apply_bootstrap(&mut self, bootstrap: Bootstrap) {
        let settings = bootstrap.renderer.clone();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.backend_mut().clear_colour = settings.clear_colour();
            renderer.projection.fovy = cgmath::Deg(settings.fov_degrees).into();
            renderer.projection.znear = settings.znear;
            renderer.projection.zfar = settings.zfar;
            renderer.camera = Camera::new(settings.camera_position, settings.camera_forward);
        }
        if let Some(controller) = self.controller.take() {
            self.controller = Some(CameraController::new(
                controller.keys,
                controller.focus,
                settings.camera_speed,
                settings.mouse_sensitivity,
            ));
        }
        self.gate = ReadinessGate::new(settings.ready_timeout());
        self.active_shader = bootstrap.active_shader().map(str::to_string);
        self.settings = settings;

        for name in bootstrap.shaders {
            self.spawn_load(async move {
                let result = load_shader_files(&name).await;
                AssetEvent::Shader { name, result }
            });
        }
        for file in bootstrap.object_files {
            self.spawn_load(async move {
                let result = load_string(&file)
                    .await
                    .map_err(|e| ResourceError::load(&file, e));
                AssetEvent::Object { file, result }
            });
        }
        for file in bootstrap.image_files {
            self.spawn_load(async move {
                let name = image_stem(&file).to_string();
                let result = load_texture_files(&file, &name).await;
                AssetEvent::Image { name, result }
            });
        }
    }

    fn on_asset(&mut self, event_loop: &ActiveEventLoop, event: AssetEvent) {
        if let AssetEvent::Initialized(ctx) = event {
            self.on_context(ctx);
            return;
        }
        if let AssetEvent::Bootstrap(result) = event {
            match result {
                Ok(bootstrap) => self.apply_bootstrap(bootstrap),
                Err(e) => {
                    log::error!(
                        "Cannot start without a bootstrap manifest: {:#}",
                        anyhow::Error::new(e)
                    );
                    event_loop.exit();
                }
            }
            return;
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let active_shader = self.active_shader.as_deref();
        let mut material_libraries = Vec::new();
        let outcome = match event {
            AssetEvent::Shader { name, result } => result.and_then(|(source, info)| {
                renderer.load_shader(&name, &source, &info)?;
                if active_shader == Some(name.as_str()) {
                    renderer.set_active_shader(&name);
                }
                Ok(())
            }),
            AssetEvent::Object { file, result } => result
                .and_then(|text| renderer.load_obj(&text, Some(image_stem(&file))))
                .and_then(|loaded| {
                    material_libraries.extend(
                        loaded
                            .material_libraries
                            .iter()
                            .map(|library| sibling_path(&file, library)),
                    );
                    if let Some(name) = loaded.mesh.name() {
                        renderer.spawn_mesh(name, IDENTITY)?;
                    }
                    Ok(())
                }),
            AssetEvent::MaterialLibrary { file, result } => {
                result.and_then(|text| renderer.load_materials(&file, &text).map(|_| ()))
            }
            AssetEvent::Image { name, result } => {
                result.and_then(|(image, sheet)| renderer.load_texture(&name, image, sheet))
            }
            AssetEvent::Initialized(_) | AssetEvent::Bootstrap(_) => Ok(()),
        };
        if let Err(e) = outcome {
            log::error!("{:#}", anyhow::Error::new(e));
        }

        for path in material_libraries {
            self.spawn_load(async move {
                let result = load_string(&path)
                    .await
                    .map_err(|e| ResourceError::load(&path, e));
                AssetEvent::MaterialLibrary { file: path, result }
            });
        }
    }
}

async fn load_bootstrap() -> Result<Bootstrap, ResourceError> {
    let text = load_string(BOOTSTRAP_FILE)
        .await
        .map_err(|e| ResourceError::load(BOOTSTRAP_FILE, e))?;
    Bootstrap::from_json(&text).map_err(|e| ResourceError::load(BOOTSTRAP_FILE, e.into()))
}

async fn load_texture_files(
    file: &str,
    name: &str,
) -> Result<(image::RgbaImage, Option<SheetInfo>), ResourceError> {
    let image = load_image(file)
        .await
        .map_err(|e| ResourceError::load(file, e))?;
    let sheet = if is_sheet(file) {
        Some(
            load_sheet_info(name)
                .await
                .map_err(|e| ResourceError::load(name, e))?,
        )
    } else {
        None
    };
    Ok((image, sheet))
}

/// `mtllib` paths are relative to the OBJ file.
fn sibling_path(file: &str, relative: &str) -> String {
    match file.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, relative),
        None => relative.to_string(),
    }
}

fn grab_cursor(window: &Window, focused: bool) {
    let grab = if focused {
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };
    if let Err(e) = grab {
        log::warn!("Cursor grab not available: {}", e);
    }
    window.set_cursor_visible(!focused);
}

impl ApplicationHandler<AssetEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("wayfarer");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(Context::new(window)) {
                Ok(ctx) => self.on_context(ctx),
                Err(e) => {
                    log::error!("Cannot create the GPU context: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match Context::new(window).await {
                    Ok(ctx) => {
                        if proxy.send_event(AssetEvent::Initialized(ctx)).is_err() {
                            log::error!("Event loop closed before the GPU context was ready");
                        }
                    }
                    Err(e) => log::error!("Cannot create the GPU context: {:#}", e),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AssetEvent) {
        self.on_asset(event_loop, event);
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let (DeviceEvent::MouseMotion { delta: (dx, dy) }, Some(controller)) =
            (event, self.controller.as_mut())
        {
            controller.handle_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let (Some(renderer), Some(controller)) = (self.renderer.as_mut(), self.controller.as_mut())
        else {
            return;
        };
        controller.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                renderer.backend_mut().resize(size.width, size.height);
                renderer.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                controller.update(&mut renderer.camera, dt);

                match self.gate.poll(renderer.is_ready()) {
                    Ok(Readiness::Ready) => {
                        if let Err(e) = renderer.render(dt) {
                            log::error!("Unable to render: {:#}", anyhow::Error::new(e));
                        }
                    }
                    Ok(Readiness::Waiting) => log::trace!("Waiting for the active shader"),
                    Err(e) => {
                        log::error!("Setup failed: {}", e);
                        event_loop.exit();
                        return;
                    }
                }
                renderer.backend().window().request_redraw();
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<AssetEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
