// shader.rs — the single program every batch is drawn with.
//
// Vertex layout (locations 0..=3) matches `Vertex`. The fragment stage
// switches on the per-vertex kind: 0 textured fill, 1 glyph coverage from the
// red channel, 2/3/4 stippled lines keyed on distance (`tex_coord.x`) and width
// (`tex_coord.y`).

use std::ffi::{CStr, CString};

use crate::error::{RenderError, Result};

pub const VERTEX_SHADER: &str = r#"
#version 300 es
precision highp float;
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec4 a_color;
layout(location = 2) in vec2 a_tex_coord;
layout(location = 3) in float a_kind;
uniform mat4 projection;
out vec4 v_color;
out vec2 v_tex_coord;
out float v_kind;
void main() {
    gl_Position = projection * vec4(a_position, 0.0, 1.0);
    v_color = a_color;
    v_tex_coord = a_tex_coord;
    v_kind = a_kind;
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
#version 300 es
precision mediump float;
uniform sampler2D u_texture;
uniform bool u_use_texture;
uniform float uGamma;
in vec4 v_color;
in vec2 v_tex_coord;
in float v_kind;
out vec4 fragColor;

// Stipple: true where the pattern is "on" at distance d for line width w.
bool stipple(int kind, float d, float w) {
    w = max(w, 1.0);
    if (kind == 2) {                     // dotted: w on, w off
        return mod(d, 2.0 * w) < w;
    }
    if (kind == 3) {                     // dashed: 4w on, 2w off
        return mod(d, 6.0 * w) < 4.0 * w;
    }
    float p = mod(d, 9.0 * w);           // dash-dot: 4w, gap 2w, w, gap 2w
    return p < 4.0 * w || (p >= 6.0 * w && p < 7.0 * w);
}

void main() {
    int kind = int(v_kind + 0.5);
    if (kind == 1) {
        float a = texture(u_texture, v_tex_coord).r;
        if (a < 0.004) discard;
        a = pow(a, 1.0 / uGamma);
        fragColor = vec4(v_color.rgb, v_color.a * a);
        return;
    }
    if (kind >= 2) {
        if (!stipple(kind, v_tex_coord.x, v_tex_coord.y)) discard;
        fragColor = v_color;
        return;
    }
    fragColor = u_use_texture ? texture(u_texture, v_tex_coord) * v_color : v_color;
}
"#;

/// Linked program plus the uniform locations flush needs every draw.
#[derive(Debug)]
pub struct ShaderProgram {
    pub id: u32,
    projection: i32,
    gamma: i32,
    texture: i32,
    use_texture: i32,
}

impl ShaderProgram {
    /// Compile and link `vert` + `frag`. The GL context must be current.
    pub unsafe fn compile(vert: &str, frag: &str) -> Result<Self> {
        let id = compile_prog(vert, frag)?;
        let program = Self {
            id,
            projection: uniform_loc(id, c"projection"),
            gamma: uniform_loc(id, c"uGamma"),
            texture: uniform_loc(id, c"u_texture"),
            use_texture: uniform_loc(id, c"u_use_texture"),
        };
        if program.projection < 0 {
            tracing::warn!("shader program {id} has no `projection` uniform");
        }
        tracing::info!("shader program {id} linked");
        Ok(program)
    }

    pub unsafe fn bind(&self) {
        gl::UseProgram(self.id);
        gl::Uniform1i(self.texture, 0);
    }

    pub unsafe fn set_projection(&self, m: &[f32; 16]) {
        gl::UniformMatrix4fv(self.projection, 1, gl::FALSE, m.as_ptr());
    }

    pub unsafe fn set_gamma(&self, gamma: f32) {
        gl::Uniform1f(self.gamma, gamma);
    }

    pub unsafe fn set_use_texture(&self, on: bool) {
        gl::Uniform1i(self.use_texture, on as i32);
    }

    pub unsafe fn delete(&self) {
        gl::DeleteProgram(self.id);
    }
}

unsafe fn uniform_loc(prog: u32, name: &CStr) -> i32 {
    gl::GetUniformLocation(prog, name.as_ptr())
}

unsafe fn compile_prog(vert: &str, frag: &str) -> Result<u32> {
    let v = compile_shader(gl::VERTEX_SHADER, "vertex", vert)?;
    let f = match compile_shader(gl::FRAGMENT_SHADER, "fragment", frag) {
        Ok(f) => f,
        Err(e) => {
            gl::DeleteShader(v);
            return Err(e);
        }
    };
    let p = gl::CreateProgram();
    gl::AttachShader(p, v);
    gl::AttachShader(p, f);
    gl::LinkProgram(p);
    gl::DeleteShader(v);
    gl::DeleteShader(f);
    let mut ok = 0i32;
    gl::GetProgramiv(p, gl::LINK_STATUS, &mut ok);
    if ok == 0 {
        let mut len = 0i32;
        gl::GetProgramiv(p, gl::INFO_LOG_LENGTH, &mut len);
        let mut buf = vec![0u8; len.max(0) as usize];
        gl::GetProgramInfoLog(p, len, std::ptr::null_mut(), buf.as_mut_ptr() as *mut _);
        gl::DeleteProgram(p);
        return Err(RenderError::ProgramLink(info_log(&buf)));
    }
    Ok(p)
}

unsafe fn compile_shader(kind: u32, stage: &'static str, src: &str) -> Result<u32> {
    let c = CString::new(src).map_err(|_| RenderError::ShaderCompile {
        stage,
        log: "source contains a NUL byte".into(),
    })?;
    let s = gl::CreateShader(kind);
    gl::ShaderSource(s, 1, &c.as_ptr(), std::ptr::null());
    gl::CompileShader(s);
    let mut ok = 0i32;
    gl::GetShaderiv(s, gl::COMPILE_STATUS, &mut ok);
    if ok == 0 {
        let mut len = 0i32;
        gl::GetShaderiv(s, gl::INFO_LOG_LENGTH, &mut len);
        let mut buf = vec![0u8; len.max(0) as usize];
        gl::GetShaderInfoLog(s, len, std::ptr::null_mut(), buf.as_mut_ptr() as *mut _);
        gl::DeleteShader(s);
        return Err(RenderError::ShaderCompile {
            stage,
            log: info_log(&buf),
        });
    }
    Ok(s)
}

fn info_log(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_log_stops_at_nul() {
        assert_eq!(info_log(b"0:3: error\n\0garbage"), "0:3: error");
        assert_eq!(info_log(b""), "");
    }

    #[test]
    fn sources_declare_the_fixed_interface() {
        for (loc, name) in ["a_position", "a_color", "a_tex_coord", "a_kind"].iter().enumerate() {
            assert!(VERTEX_SHADER.contains(&format!("layout(location = {loc}) in")));
            assert!(VERTEX_SHADER.contains(name));
        }
        assert!(VERTEX_SHADER.contains("uniform mat4 projection;"));
        assert!(FRAGMENT_SHADER.contains("uniform float uGamma;"));
        assert!(FRAGMENT_SHADER.contains("uniform bool u_use_texture;"));
        assert!(!VERTEX_SHADER.contains('\0') && !FRAGMENT_SHADER.contains('\0'));
    }
}
