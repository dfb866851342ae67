use crate::device_display::interface::{DeviceDisplay, DeviceDisplayEvent};
use eframe::egui;
use std::error::Error;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct GuiView {
    running: bool,
    label: String,
    alert: Option<String>,
    model_url: String,
}

fn lock(view: &Mutex<GuiView>) -> MutexGuard<'_, GuiView> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct DisplayWindow {
    view: Arc<Mutex<GuiView>>,
    event_sender: Sender<DeviceDisplayEvent>,
}

impl DisplayWindow {
    /// Blocks until the window is closed, then requests quit. Must run on
    /// the main thread.
    pub fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let quit_sender = self.event_sender.clone();
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([420.0, 220.0])
                .with_resizable(false),
            ..Default::default()
        };

        let closed = eframe::run_native(
            "micro:bit ML bridge",
            options,
            Box::new(|_cc| Box::new(self)),
        );
        let _ = quit_sender.send(DeviceDisplayEvent::QuitRequested);
        closed.map_err(|e| e.to_string().into())
    }
}

impl eframe::App for DisplayWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut view = lock(&self.view);
        let mut requested = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(alert) = view.alert.clone() {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(200, 60, 60), alert);
                    if ui.button("Dismiss").clicked() {
                        view.alert = None;
                    }
                });
                ui.separator();
            }

            if view.running {
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.label(
                        egui::RichText::new(view.label.as_str())
                            .monospace()
                            .size(28.0),
                    );
                    ui.add_space(20.0);
                    if ui.button("Reset").clicked() {
                        requested = Some(DeviceDisplayEvent::ResetRequested);
                    }
                });
            } else {
                ui.label("Teachable Machine model url");
                ui.text_edit_singleline(&mut view.model_url);
                if ui.button("Start").clicked() {
                    requested = Some(DeviceDisplayEvent::StartRequested {
                        model_url: view.model_url.trim().to_string(),
                    });
                }
            }
        });

        drop(view);
        if let Some(event) = requested {
            let _ = self.event_sender.send(event);
        }
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// egui window. State is shared with the `DisplayWindow` returned by
/// `window`, which the caller runs on the main thread.
pub struct DeviceDisplayGui {
    view: Arc<Mutex<GuiView>>,
    event_sender: Sender<DeviceDisplayEvent>,
    event_receiver: Mutex<Option<Receiver<DeviceDisplayEvent>>>,
}

impl DeviceDisplayGui {
    pub fn new(model_url: Option<&str>) -> Self {
        let (event_sender, event_receiver) = channel();
        let view = GuiView {
            model_url: model_url.unwrap_or_default().to_string(),
            ..GuiView::default()
        };
        Self {
            view: Arc::new(Mutex::new(view)),
            event_sender,
            event_receiver: Mutex::new(Some(event_receiver)),
        }
    }

    pub fn window(&self) -> DisplayWindow {
        DisplayWindow {
            view: self.view.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}

impl DeviceDisplay for DeviceDisplayGui {
    fn show_setup_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut view = lock(&self.view);
        view.running = false;
        view.label.clear();
        Ok(())
    }

    fn show_running_mode(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut view = lock(&self.view);
        view.running = true;
        view.alert = None;
        Ok(())
    }

    fn update_label(&mut self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        lock(&self.view).label = text.to_string();
        Ok(())
    }

    fn show_alert(&mut self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        lock(&self.view).alert = Some(message.to_string());
        Ok(())
    }

    fn events(&mut self) -> Receiver<DeviceDisplayEvent> {
        let event_receiver = self
            .event_receiver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        match event_receiver.take() {
            Some(receiver) => receiver,
            None => channel().1,
        }
    }
}
