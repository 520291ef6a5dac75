//! Elevated execution through a Windows scheduled task.
//!
//! The remote channel runs commands as its own (often non-interactive,
//! filtered-token) user. To run a script with full rights we upload a small
//! wrapper that registers a one-shot scheduled task under the elevated
//! user's credentials, runs it, relays its log, and exits with the task's
//! result.

use crate::encoding::encode_command;
use crate::error::{ProvisionError, Result};
use crate::ids::IdGenerator;
use crate::remote::{RemoteChannel, RemoteFile};
use crate::template::{fields, render_template};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Description shown in Task Scheduler for every elevated task.
pub const TASK_DESCRIPTION: &str = "psprov elevated task";

/// Scheduled-task wrapper script.
///
/// Fields: `User`, `Password`, `TaskDescription`, `TaskName`, `EncodedCommand`.
/// `User` and `Password` appear only inside single-quoted PowerShell strings.
pub const ELEVATED_WRAPPER_TEMPLATE: &str = r#"$name = '{{.TaskName}}'
$log = "$env:TEMP\$name.out"
$s = New-Object -ComObject 'Schedule.Service'
$s.Connect()
$t = $s.NewTask($null)
$t.XmlText = @'
<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <Description>{{.TaskDescription}}</Description>
  </RegistrationInfo>
  <Principals>
    <Principal id="Author">
      <LogonType>Password</LogonType>
      <RunLevel>HighestAvailable</RunLevel>
    </Principal>
  </Principals>
  <Settings>
    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <AllowHardTerminate>true</AllowHardTerminate>
    <StartWhenAvailable>false</StartWhenAvailable>
    <RunOnlyIfNetworkAvailable>false</RunOnlyIfNetworkAvailable>
    <IdleSettings>
      <StopOnIdleEnd>false</StopOnIdleEnd>
      <RestartOnIdle>false</RestartOnIdle>
    </IdleSettings>
    <AllowStartOnDemand>true</AllowStartOnDemand>
    <Enabled>true</Enabled>
    <Hidden>false</Hidden>
    <RunOnlyIfIdle>false</RunOnlyIfIdle>
    <WakeToRun>false</WakeToRun>
    <ExecutionTimeLimit>PT24H</ExecutionTimeLimit>
    <Priority>4</Priority>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>cmd</Command>
      <Arguments>/c powershell.exe -EncodedCommand {{.EncodedCommand}} &gt; %TEMP%\{{.TaskName}}.out 2&gt;&amp;1</Arguments>
    </Exec>
  </Actions>
</Task>
'@
if (Test-Path variable:global:ProgressPreference){$ProgressPreference='SilentlyContinue'}
$f = $s.GetFolder('\')
$f.RegisterTaskDefinition($name, $t, 6, '{{.User}}', '{{.Password}}', 1, $null) | Out-Null
$t = $f.GetTask("\$name")
$t.Run($null) | Out-Null
$timeout = 10
$sec = 0
while ((!($t.state -eq 4)) -and ($sec -lt $timeout)) {
  Start-Sleep -s 1
  $sec++
}
$line = 0
do {
  Start-Sleep -m 100
  if (Test-Path $log) {
    Get-Content $log | select -skip $line | ForEach {
      $line += 1
      Write-Output "$_"
    }
  }
} while (!($t.state -eq 3))
$result = $t.LastTaskResult
$f.DeleteTask($name, 0)
[System.Runtime.Interopservices.Marshal]::ReleaseComObject($s) | Out-Null
exit $result
"#;

/// Credentials of the user elevated scripts run as.
#[derive(Clone, PartialEq, Eq)]
pub struct ElevatedCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ElevatedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevatedCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything the wrapper template needs. Built once per rendering.
pub struct ElevatedTaskSpec<'a> {
    pub credentials: &'a ElevatedCredentials,
    pub task_description: &'a str,
    pub task_name: String,
    pub encoded_command: String,
}

impl ElevatedTaskSpec<'_> {
    /// Template fields, escaped for where each one lands in the wrapper.
    pub fn fields(&self) -> HashMap<String, String> {
        fields([
            ("User", quote_single(&self.credentials.user)),
            ("Password", quote_single(&self.credentials.password)),
            ("TaskDescription", escape_xml(self.task_description)),
            ("TaskName", self.task_name.clone()),
            ("EncodedCommand", self.encoded_command.clone()),
        ])
    }

    /// Render the wrapper script.
    pub fn render(&self) -> Result<String> {
        Ok(render_template(ELEVATED_WRAPPER_TEMPLATE, &self.fields())?)
    }
}

/// Escape text for a single-quoted PowerShell string.
fn quote_single(value: &str) -> String {
    value.replace('\'', "''")
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap `command` in a scheduled-task script, upload it, and return where it lives.
///
/// Each call uploads one new file; nothing here removes it afterwards.
pub fn upload_elevated_wrapper(
    command: &str,
    credentials: &ElevatedCredentials,
    ids: &dyn IdGenerator,
    channel: &mut dyn RemoteChannel,
) -> Result<RemoteFile> {
    debug!(command = %command, "building elevated command wrapper");

    let spec = ElevatedTaskSpec {
        credentials,
        task_description: TASK_DESCRIPTION,
        task_name: format!("psprov-{}", ids.next_id()),
        encoded_command: encode_command(command),
    };
    let script = spec.render()?;

    let file = RemoteFile::in_temp(&format!("psprov-elevated-shell-{}.ps1", ids.next_id()));
    info!(path = %file.upload_path, task = %spec.task_name, "uploading elevated shell wrapper");
    channel
        .upload(&file.upload_path, &mut script.as_bytes(), false)
        .map_err(|source| ProvisionError::Upload {
            path: file.upload_path.clone(),
            source,
        })?;

    Ok(file)
}
