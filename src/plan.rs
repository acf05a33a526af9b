//! Ordered bootstrap plan built from a [`Config`].

use serde::Serialize;

use crate::config::Config;
use crate::step::{Step, StepId, Toggle};

/// A step together with its position and on/off state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub id: StepId,
    pub toggle: Toggle,
    pub step: Step,
}

/// The six bootstrap steps, always in sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn from_config(config: &Config) -> Self {
        let steps = vec![
            PlannedStep {
                id: StepId::Compat,
                toggle: Toggle::Enabled,
                step: Step::InstallCompat {
                    manager: config.package_manager.program.clone(),
                    yes_flag: config.package_manager.yes_flag.clone(),
                    packages: config.package_manager.packages.clone(),
                },
            },
            PlannedStep {
                id: StepId::Build,
                toggle: Toggle::from_enabled(config.build_script.enabled),
                step: Step::SourceScript {
                    shell: config.shell.clone(),
                    path: config.build_script.path.clone(),
                },
            },
            PlannedStep {
                id: StepId::Test,
                toggle: Toggle::from_enabled(config.test_script.enabled),
                step: Step::SourceScript {
                    shell: config.shell.clone(),
                    path: config.test_script.path.clone(),
                },
            },
            PlannedStep {
                id: StepId::Index,
                toggle: Toggle::Enabled,
                step: Step::SetEnv {
                    name: config.index.variable.clone(),
                    value: config.index.url.clone(),
                },
            },
            PlannedStep {
                id: StepId::Package,
                toggle: Toggle::Enabled,
                step: Step::InstallPackage {
                    installer: config.package.installer.clone(),
                    package: config.package.name.clone(),
                    extras: config.package.extras.clone(),
                },
            },
            PlannedStep {
                id: StepId::Project,
                toggle: Toggle::Enabled,
                step: Step::InstallProject {
                    installer: config.project.installer.clone(),
                    path: config.project.path.clone(),
                    editable: config.project.editable,
                    extras: config.project.extras.clone(),
                },
            },
        ];
        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn get(&self, id: StepId) -> Option<&PlannedStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Switch one step on or off. Order and the other steps are untouched.
    pub fn set_toggle(&mut self, id: StepId, toggle: Toggle) {
        if let Some(planned) = self.steps.iter_mut().find(|s| s.id == id) {
            planned.toggle = toggle;
        }
    }

    /// Steps that will actually run.
    pub fn enabled(&self) -> impl Iterator<Item = &PlannedStep> {
        self.steps.iter().filter(|s| s.toggle.is_enabled())
    }
}
